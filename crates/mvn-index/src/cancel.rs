//! Cancellation tokens for scanning and index builds.
//!
//! The caller owns cancellation: a token is handed to `scan` or
//! `open_or_build` and checked between directory entries, so a cancelled
//! walk stops at the next file boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{IndexError, Result};

/// A cancellation token for terminating long-running operations.
///
/// Clones share the same flag, so one clone can be moved to another thread
/// and used to cancel work running against the other.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Creates a token that can be cancelled.
    pub fn new() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Creates a cancellation token that is never cancelled.
    ///
    /// Useful for tests or operations that should not be interruptible.
    #[inline]
    pub fn noop() -> Self {
        Self { flag: None }
    }

    /// Requests cancellation. No-op tokens ignore the request.
    pub fn cancel(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::SeqCst);
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Returns `Err(IndexError::Cancelled)` once cancellation was requested,
    /// for use with the `?` operator.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(IndexError::Cancelled)
        } else {
            Ok(())
        }
    }
}
