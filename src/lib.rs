//! Keep two folders of text notes agreeing with each other.
//!
//! Each run walks both roots, settles every file against the last content
//! both sides agreed on, and atomically commits a new agreement snapshot.
//! See the [`sync`] module for the per-path state machine.

pub mod config;
pub mod file_util;
pub mod filter;
pub mod hashing;
pub mod merge;
pub mod store;
pub mod sync;
pub mod walk;
