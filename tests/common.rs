#![allow(dead_code)]

use std::fs;
use std::path::Path;

use anyhow::Result;
use assert_cmd::Command;

/// Builds an invocation of our binary with the given state directory.
///
/// HOME is pointed somewhere empty so a developer's real ~/.config/seam.toml
/// can't leak into test runs.
pub fn cli_run(home: &Path, state_dir: &Path) -> Result<Command> {
    let bin_name = env!("CARGO_PKG_NAME");
    let mut cmd = Command::cargo_bin(bin_name)?;
    cmd.env("HOME", home);
    cmd.env_remove("SEAM_STATE_DIR");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--state-dir").arg(state_dir);
    Ok(cmd)
}

/// Same, but with no state directory configured anywhere.
pub fn cli_run_stateless(home: &Path) -> Result<Command> {
    let bin_name = env!("CARGO_PKG_NAME");
    let mut cmd = Command::cargo_bin(bin_name)?;
    cmd.env("HOME", home);
    cmd.env_remove("SEAM_STATE_DIR");
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

pub fn write_note(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("relative path with no parent"))
        .expect("couldn't create parent dirs");
    fs::write(path, contents).expect("couldn't write note");
}

pub fn read_note(root: &Path, rel: &str) -> String {
    String::from_utf8(fs::read(root.join(rel)).expect("couldn't read note"))
        .expect("note isn't UTF-8")
}
