//! The reconciliation run: walk both roots, settle each path against the
//! stored ancestor, and write the agreed-upon content back to both sides.
//!
//! Per path, the moves are:
//! - Only one side has it: copy to the other side.
//! - Both sides match: nothing to write (record first agreement if new).
//! - Diverged with no usable ancestor: seed-merge by mtime.
//! - Diverged with an ancestor: three-way merge.
//!
//! Whatever lands on both sides becomes the new ancestor, which is what
//! lets the first seed-merge bootstrap real three-way merges on every run
//! after it.

use std::fmt;

use anyhow::{Result, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use enum_map::{Enum, EnumMap};
use tracing::*;

use crate::file_util;
use crate::filter::{IncludeGlob, Matcher};
use crate::merge;
use crate::store::{StateEntry, StateStore, SyncState};
use crate::walk;

/// Configures a synchronization run.
pub struct Options {
    /// The two roots to reconcile
    pub root_a: Utf8PathBuf,
    pub root_b: Utf8PathBuf,
    /// Where the snapshot and ancestor blobs live. Ours, exclusively.
    pub state_dir: Utf8PathBuf,
    pub include: IncludeGlob,
    pub ignores: Box<dyn Matcher>,
    /// Stage `.bak.a`/`.bak.b` copies before overwriting both sides
    pub backups: bool,
    /// Seed-merge tie window: mtimes closer than this many seconds get
    /// conflict markers instead of newer-wins.
    pub mtime_epsilon: f64,
}

/// What the reconciler decided to do with one path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Enum)]
pub enum Action {
    /// Root A was missing the file; B's copy came over.
    CreateA,
    /// Root B was missing the file; A's copy came over.
    CreateB,
    /// First-contact divergence, settled by mtime (or markers on a tie).
    MergeSeed,
    /// Three-way merge via the external tool.
    MergeThreeWay,
    /// Marker fallback, ancestor notwithstanding.
    MergeTwoWay,
    /// Both sides already agree.
    Equal,
    /// Gone from both sides; the record follows.
    Absent,
}

impl Action {
    /// Did this action write at least one side?
    fn writes(self) -> bool {
        !matches!(self, Action::Equal | Action::Absent)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Action::CreateA => "A<-B (create)",
            Action::CreateB => "B<-A (create)",
            Action::MergeSeed => "merge(seed)",
            Action::MergeThreeWay => "merge(3way)",
            Action::MergeTwoWay => "merge(2way)",
            Action::Equal => "equal",
            Action::Absent => "absent",
        };
        f.pad(tag)
    }
}

/// What a run did, in numbers.
#[derive(Debug, Default)]
pub struct SyncResult {
    /// Paths where at least one side was written
    pub changed_files: usize,
    pub actions: EnumMap<Action, usize>,
    pub diff3_available: bool,
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "changed={}", self.changed_files)?;
        for (action, count) in &self.actions {
            if *count > 0 {
                write!(f, "; {action}={count}")?;
            }
        }
        write!(
            f,
            "; diff3={}",
            if self.diff3_available { "yes" } else { "no" }
        )
    }
}

/// Reconciles the two roots once, committing a new snapshot at the end.
///
/// Paths are processed in sorted order, and nothing here is concurrent, so
/// two runs over identical inputs do identical writes.
pub fn run(options: &Options) -> Result<SyncResult> {
    ensure!(
        !options.state_dir.as_str().is_empty(),
        "No state directory configured"
    );

    let (store, mut state) = StateStore::open(&options.state_dir)?;

    let candidates = walk::sorted_union(
        &options.root_a,
        &options.root_b,
        &options.include,
        options.ignores.as_ref(),
    )?;

    let diff3 = merge::diff3_available();
    if !diff3 {
        info!("diff3 not found; conflicting merges get marker output");
    }

    let mut result = SyncResult {
        diff3_available: diff3,
        ..Default::default()
    };

    for rel in &candidates {
        let action = reconcile_path(rel, options, &store, &mut state, diff3)?;
        result.actions[action] += 1;
        if action.writes() {
            result.changed_files += 1;
        }
    }

    store.commit(&state)?;
    info!(
        "Looked at {} files, changed {}",
        candidates.len(),
        result.changed_files
    );
    Ok(result)
}

/// One step of the per-path state machine, keyed on which sides exist.
fn reconcile_path(
    rel: &Utf8Path,
    options: &Options,
    store: &StateStore,
    state: &mut SyncState,
    diff3: bool,
) -> Result<Action> {
    let path_a = options.root_a.join(rel);
    let path_b = options.root_b.join(rel);

    match (path_a.exists(), path_b.exists()) {
        (false, false) => {
            // Vanished since discovery; drop any record of it.
            state.file_entry.remove(rel);
            debug!("{:>9} {rel}", "absent");
            Ok(Action::Absent)
        }
        (true, false) => {
            let content = file_util::read_file(&path_a)?;
            file_util::write_creating_dirs(&path_b, &content)?;
            let id = store.put_ancestor(&content)?;
            state
                .file_entry
                .insert(rel.to_owned(), StateEntry { ancestor_hex: id });
            debug!("{:>9} {rel}", "B<-A");
            Ok(Action::CreateB)
        }
        (false, true) => {
            let content = file_util::read_file(&path_b)?;
            file_util::write_creating_dirs(&path_a, &content)?;
            let id = store.put_ancestor(&content)?;
            state
                .file_entry
                .insert(rel.to_owned(), StateEntry { ancestor_hex: id });
            debug!("{:>9} {rel}", "A<-B");
            Ok(Action::CreateA)
        }
        (true, true) => reconcile_both_sides(rel, &path_a, &path_b, options, store, state, diff3),
    }
}

fn reconcile_both_sides(
    rel: &Utf8Path,
    path_a: &Utf8Path,
    path_b: &Utf8Path,
    options: &Options,
    store: &StateStore,
    state: &mut SyncState,
    diff3: bool,
) -> Result<Action> {
    let content_a = file_util::read_file(path_a)?;
    let content_b = file_util::read_file(path_b)?;

    if content_a == content_b {
        // First sighting of an already-agreeing pair: record the agreement
        // so future divergence merges three-way.
        if !state.file_entry.contains_key(rel) {
            let id = store.put_ancestor(&content_a)?;
            state
                .file_entry
                .insert(rel.to_owned(), StateEntry { ancestor_hex: id });
        }
        trace!("{:>9} {rel}", "equal");
        return Ok(Action::Equal);
    }

    // An unreadable ancestor demotes this path to a seed-merge; a missing
    // blob is no reason to abort the run.
    let base = state
        .file_entry
        .get(rel)
        .and_then(|entry| store.read_ancestor(&entry.ancestor_hex));

    if options.backups {
        file_util::copy_best_effort(path_a, &bak_path(path_a, "a"));
        file_util::copy_best_effort(path_b, &bak_path(path_b, "b"));
    }

    let (merged, action) = match base {
        None => (
            seed_merge(
                path_a,
                &content_a,
                path_b,
                &content_b,
                options.mtime_epsilon,
            ),
            Action::MergeSeed,
        ),
        Some(base) => {
            let (merged, flavor) = merge::three_way(&base, &content_a, &content_b, diff3);
            let action = match flavor {
                merge::Flavor::ThreeWay => Action::MergeThreeWay,
                merge::Flavor::TwoWay => Action::MergeTwoWay,
            };
            (merged, action)
        }
    };

    file_util::write_creating_dirs(path_a, &merged)?;
    file_util::write_creating_dirs(path_b, &merged)?;
    let id = store.put_ancestor(&merged)?;
    state
        .file_entry
        .insert(rel.to_owned(), StateEntry { ancestor_hex: id });
    debug!("{:>9} {rel}", action);
    Ok(action)
}

/// First-contact divergence: no ancestor to anchor a real merge, so let
/// mtimes pick a side. Clearly newer wins; too close to call keeps both
/// sides behind markers.
///
/// Mtimes matter only here. Once an ancestor exists they're never read.
fn seed_merge(
    path_a: &Utf8Path,
    content_a: &[u8],
    path_b: &Utf8Path,
    content_b: &[u8],
    epsilon: f64,
) -> Vec<u8> {
    let delta = file_util::mtime_seconds(path_a) - file_util::mtime_seconds(path_b);
    if delta.abs() <= epsilon {
        debug!("mtimes within {epsilon}s of each other; keeping both sides");
        merge::with_markers(content_a, content_b)
    } else if delta > 0.0 {
        content_a.to_vec()
    } else {
        content_b.to_vec()
    }
}

fn bak_path(path: &Utf8Path, side: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.bak.{side}"))
}
