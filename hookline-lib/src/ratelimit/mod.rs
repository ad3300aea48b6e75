//! Rate limiting of webhook deliveries.
//!
//! The webhook endpoint decides how many requests it accepts per window and
//! tells us with every response. [`Bucket`] tracks that state. It is shared
//! between the drainer, which updates it after every exchange, and anyone
//! who wants to inspect it, hence the [`SharedBucket`] wrapper.

mod bucket;
mod headers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use bucket::{Bucket, FALLBACK_RETRY_AFTER, UNBOUNDED};

/// A [`Bucket`] behind a lock.
///
/// The bucket is plain data and every update leaves it consistent, so a
/// poisoned lock is recovered instead of propagated.
#[derive(Debug, Clone, Default)]
pub struct SharedBucket(Arc<Mutex<Bucket>>);

impl SharedBucket {
    /// Create a shared bucket which allows requests right away
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the bucket.
    ///
    /// Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, Bucket> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> Bucket {
        self.lock().clone()
    }
}
