//! Advisory single-writer lock guarding a prune database directory.
//!
//! Two `truss` processes pointed at the same build directory must not
//! interleave writes to the prune files; this mirrors the single-writer
//! discipline other lock-guarded subsystems in this codebase follow, built
//! on the same `fd-lock` crate.

use std::fs::File;
use std::path::{Path, PathBuf};

use fd_lock::RwLock;

use crate::error::PruneError;

pub struct PruneLock {
    file: RwLock<File>,
    path: PathBuf,
}

impl PruneLock {
    pub fn new(prune_dir: &Path) -> Result<Self, PruneError> {
        std::fs::create_dir_all(prune_dir)?;
        let path = prune_dir.join(".lock");
        let file = File::create(&path)?;
        Ok(Self {
            file: RwLock::new(file),
            path,
        })
    }

    /// Acquires the exclusive write lock, non-blocking, and holds it for
    /// the lifetime of the underlying file descriptor rather than the
    /// returned guard.
    ///
    /// `fd_lock`'s guard releases the lock on drop, but callers of this
    /// method need the lock held for as long as `self` (and the `File` it
    /// wraps) is alive, not just for the guard's borrow scope. We forget
    /// the guard instead of returning or storing it: the `try_write` call
    /// still does the real locking syscall, we just skip the unlock that
    /// would otherwise run when the guard's destructor fires. The OS-level
    /// lock is released when the wrapped file descriptor is closed, which
    /// happens when this `PruneLock` (and the `File` inside it) drops.
    pub fn acquire_write(&mut self) -> Result<(), PruneError> {
        let guard = self
            .file
            .try_write()
            .map_err(|_| PruneError::Locked(self.path.clone()))?;
        std::mem::forget(guard);
        Ok(())
    }
}
