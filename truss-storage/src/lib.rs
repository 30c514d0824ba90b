//! # truss-storage
//!
//! The prune database: plain-text, per-build-directory records of which
//! tests failed, which passed, and when the last full run completed.
//! Concurrent writers are serialized with an advisory file lock.

pub mod error;
pub mod fileset;
pub mod lock;
pub mod prune;

pub use error::{PruneError, PruneResult};
pub use prune::{PruneDatabase, PruneState};
