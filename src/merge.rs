//! Producing merged bytes: `diff3` when we have it, conflict markers when
//! we don't.

use std::process::{Command, Stdio};

use tracing::*;

/// How a merge got its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// The external tool merged against the common ancestor.
    ThreeWay,
    /// Marker fallback: both sides, no ancestor consulted.
    TwoWay,
}

/// Checks whether `diff3` can be spawned at all. Probed once per run.
pub fn diff3_available() -> bool {
    Command::new("diff3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Merges two diverged sides against their common ancestor.
///
/// Prefers `diff3 -m`; anything that keeps it from producing usable output
/// (not installed, spawn failure, weird exit) quietly downgrades to the
/// two-way marker format.
pub fn three_way(base: &[u8], side_a: &[u8], side_b: &[u8], diff3: bool) -> (Vec<u8>, Flavor) {
    if diff3 {
        if let Some(merged) = diff3_merge(base, side_a, side_b) {
            return (merged, Flavor::ThreeWay);
        }
    }
    (with_markers(side_a, side_b), Flavor::TwoWay)
}

/// Wraps both sides in conflict markers, the oldest trick in the book.
///
/// Each side gets a trailing newline appended only if it's non-empty and
/// doesn't already end with one, so the markers always sit on their own
/// lines.
pub fn with_markers(side_a: &[u8], side_b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(side_a.len() + side_b.len() + 48);
    out.extend_from_slice(b"<<<<<<< SIDE_A\n");
    out.extend_from_slice(side_a);
    if side_a.last().is_some_and(|b| *b != b'\n') {
        out.push(b'\n');
    }
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(side_b);
    if side_b.last().is_some_and(|b| *b != b'\n') {
        out.push(b'\n');
    }
    out.extend_from_slice(b">>>>>>> SIDE_B\n");
    out
}

/// Runs `diff3 -m` over temp copies of the three inputs.
///
/// Exit status 0 is a clean merge; 1 is a merge with conflict hunks the
/// tool marked up itself. Both count as usable output. Everything else,
/// including failing to stage the inputs, means no merge.
fn diff3_merge(base: &[u8], side_a: &[u8], side_b: &[u8]) -> Option<Vec<u8>> {
    let dir = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => {
            debug!("Couldn't stage diff3 inputs: {e}");
            return None;
        }
    };
    let base_path = dir.path().join("base");
    let a_path = dir.path().join("a");
    let b_path = dir.path().join("b");
    for (path, bytes) in [(&base_path, base), (&a_path, side_a), (&b_path, side_b)] {
        if let Err(e) = std::fs::write(path, bytes) {
            debug!("Couldn't stage diff3 inputs: {e}");
            return None;
        }
    }

    let output = match Command::new("diff3")
        .arg("-m")
        .arg(&a_path)
        .arg(&base_path)
        .arg(&b_path)
        .output()
    {
        Ok(o) => o,
        Err(e) => {
            debug!("Couldn't run diff3: {e}");
            return None;
        }
    };

    match output.status.code() {
        Some(0) | Some(1) => {
            let mut merged = output.stdout;
            merged.extend_from_slice(&output.stderr);
            Some(merged)
        }
        other => {
            debug!("diff3 exited with {other:?}; falling back to markers");
            None
        }
    }
}
