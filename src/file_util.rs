//! Small filesystem helpers shared by the walk, the store, and the
//! reconciler.

use std::fs;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::*;

/// Reads a payload file whole. Notes are small; no need to get clever.
pub fn read_file(path: &Utf8Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Couldn't read {path}"))
}

/// Writes `bytes` to `path`, creating parent directories as needed.
///
/// Payload files are written in place, no temp + rename: the user edits
/// these files directly, and a failed write aborts the whole run anyway.
pub fn write_creating_dirs(path: &Utf8Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Couldn't create {parent}"))?;
    }
    fs::write(path, bytes).with_context(|| format!("Couldn't write {path}"))
}

/// Best-effort copy for pre-merge backups. The sync proceeds either way.
pub fn copy_best_effort(from: &Utf8Path, to: &Utf8Path) {
    if let Err(e) = fs::copy(from, to) {
        trace!("Couldn't copy {from} to {to}: {e}");
    }
}

/// The file's mtime as floating-point seconds since the epoch,
/// at nanosecond resolution where the platform provides it.
///
/// Unreadable metadata maps to zero.
pub fn mtime_seconds(path: &Utf8Path) -> f64 {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(m) => m,
        Err(_) => return 0.0,
    };
    match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        // Files from before 1970. Sure, why not.
        Err(e) => -e.duration().as_secs_f64(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use camino::Utf8PathBuf;

    fn utf8_temp() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
        (dir, path)
    }

    #[test]
    fn write_makes_parents() -> Result<()> {
        let (_dir, root) = utf8_temp();
        let nested = root.join("some/deep/dir/note.md");
        write_creating_dirs(&nested, b"hi")?;
        assert_eq!(read_file(&nested)?, b"hi");
        Ok(())
    }

    #[test]
    fn copy_of_nothing_is_quiet() {
        let (_dir, root) = utf8_temp();
        copy_best_effort(&root.join("not-here"), &root.join("nor-here"));
        assert!(!root.join("nor-here").exists());
    }

    #[test]
    fn mtimes_look_sane() -> Result<()> {
        let (_dir, root) = utf8_temp();
        let f = root.join("f");
        write_creating_dirs(&f, b"x")?;
        // Sometime between 2001 and the heat death of the universe.
        assert!(mtime_seconds(&f) > 1e9);
        assert_eq!(mtime_seconds(&root.join("not-here")), 0.0);
        Ok(())
    }
}
