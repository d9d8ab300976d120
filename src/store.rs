//! The state directory: a `state.json` snapshot plus content-addressed
//! ancestor blobs.
//!
//! The snapshot records, per relative path, the digest of the content both
//! sides last agreed on. The blobs hold those contents, each named by its
//! digest, written once and never touched again. Blobs always land on disk
//! before the snapshot referencing them, and the snapshot itself is swapped
//! in with a rename, so a crash at any point leaves the previous run's
//! state intact.

use std::collections::BTreeMap;
use std::fs;
use std::io;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_derive::{Deserialize, Serialize};
use tracing::*;

use crate::hashing::Digest;

/// One path's record: the digest of the last agreed-upon content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub ancestor_hex: Digest,
}

/// The whole snapshot, keyed by slash-normalized relative path.
///
/// No entry for a path means no agreement was ever recorded.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub file_entry: BTreeMap<Utf8PathBuf, StateEntry>,
}

pub struct StateStore {
    state_path: Utf8PathBuf,
    ancestor_dir: Utf8PathBuf,
}

impl StateStore {
    /// Opens the state directory, creating it (and an empty on-disk
    /// snapshot) on first contact. A snapshot that exists but doesn't parse
    /// is fatal.
    pub fn open(state_dir: &Utf8Path) -> Result<(Self, SyncState)> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("Couldn't create state directory {state_dir}"))?;
        let ancestor_dir = state_dir.join("ancestors");
        fs::create_dir_all(&ancestor_dir)
            .with_context(|| format!("Couldn't create {ancestor_dir}"))?;

        let store = Self {
            state_path: state_dir.join("state.json"),
            ancestor_dir,
        };

        let state = match fs::read(&store.state_path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Couldn't parse {}", store.state_path))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No {} yet, starting fresh", store.state_path);
                let empty = SyncState::default();
                store.commit(&empty)?;
                empty
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Couldn't read {}", store.state_path));
            }
        };
        Ok((store, state))
    }

    /// Reads the blob for the given digest.
    ///
    /// Any failure here reads as "no ancestor available" and sends the
    /// caller down the seed-merge path instead.
    pub fn read_ancestor(&self, id: &Digest) -> Option<Vec<u8>> {
        match fs::read(self.ancestor_path(id)) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("No usable ancestor {}: {e}", id.short_name());
                None
            }
        }
    }

    /// Stores `bytes` as an ancestor blob and returns its digest.
    ///
    /// Blobs are immutable, so an already-present file means the work is
    /// already done.
    pub fn put_ancestor(&self, bytes: &[u8]) -> Result<Digest> {
        let id = Digest::hash(bytes);
        let path = self.ancestor_path(&id);
        if !path.exists() {
            fs::write(&path, bytes)
                .with_context(|| format!("Couldn't write ancestor {path}"))?;
            trace!("Stored ancestor {}", id.short_name());
        }
        Ok(id)
    }

    /// Commits the snapshot: serialize to `state.json.tmp`, then rename over
    /// `state.json`. The rename is the commit point.
    pub fn commit(&self, state: &SyncState) -> Result<()> {
        let tmp = Utf8PathBuf::from(format!("{}.tmp", self.state_path));
        let json = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, json).with_context(|| format!("Couldn't write {tmp}"))?;
        fs::rename(&tmp, &self.state_path)
            .with_context(|| format!("Couldn't rename {tmp} over {}", self.state_path))
    }

    fn ancestor_path(&self, id: &Digest) -> Utf8PathBuf {
        self.ancestor_dir.join(id.to_string())
    }
}
