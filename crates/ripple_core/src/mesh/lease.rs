//! Live-view accounting.
//!
//! A [`Lease`] increments a shared counter on creation and decrements it on
//! drop, the same way a read handle tracks how many readers are active.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counter of outstanding leases.
#[derive(Clone, Debug, Default)]
pub struct LiveCounter {
    count: Arc<AtomicUsize>,
}

impl LiveCounter {
    /// Creates a counter with no outstanding leases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a new lease.
    #[must_use]
    pub fn lease(&self) -> Lease {
        self.count.fetch_add(1, Ordering::AcqRel);
        Lease {
            count: Some(Arc::clone(&self.count)),
        }
    }

    /// Number of leases not yet dropped.
    #[inline]
    #[must_use]
    pub fn live(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

/// Proof that a view is outstanding. Released on drop, exactly once.
#[derive(Debug)]
pub struct Lease {
    count: Option<Arc<AtomicUsize>>,
}

impl Lease {
    /// A lease not tied to any counter.
    #[must_use]
    pub const fn detached() -> Self {
        Self { count: None }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(count) = self.count.take() {
            count.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
