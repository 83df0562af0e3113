//! Claims on open repository locations.
//!
//! A claim is held twice: in a process-wide set, so two contexts in one
//! process cannot share a location, and as an exclusive lock on a file next
//! to the index directory, so two processes cannot either.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use fnv::FnvHashSet;
use parking_lot::Mutex;

use crate::error::{IndexError, Result};

static OPEN_LOCATIONS: LazyLock<Mutex<FnvHashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(FnvHashSet::default()));

/// Exclusive claim on one repository location, released on drop.
#[derive(Debug)]
pub(crate) struct LocationLease {
    location: PathBuf,
    /// Held open for the lifetime of the lease; closing it unlocks.
    lock: Option<File>,
}

impl LocationLease {
    /// Claims `location` (expected to be canonical) and locks `lock_path`.
    /// Fails while another context, in this or another process, holds it.
    pub(crate) fn acquire(location: &Path, lock_path: &Path) -> Result<Self> {
        if !OPEN_LOCATIONS.lock().insert(location.to_path_buf()) {
            return Err(IndexError::Lifecycle(format!(
                "an index context is already open for {}",
                location.display()
            )));
        }
        // Constructed first so a failed lock still releases the claim.
        let mut lease = Self {
            location: location.to_path_buf(),
            lock: None,
        };
        lease.lock = Some(lock_file(lock_path)?);
        Ok(lease)
    }
}

fn lock_file(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    match file.try_lock() {
        Ok(()) => Ok(file),
        Err(TryLockError::WouldBlock) => Err(IndexError::Lifecycle(format!(
            "{} is locked by another process",
            path.display()
        ))),
        Err(TryLockError::Error(error)) => Err(error.into()),
    }
}

impl Drop for LocationLease {
    fn drop(&mut self) {
        self.lock.take();
        OPEN_LOCATIONS.lock().remove(&self.location);
    }
}
