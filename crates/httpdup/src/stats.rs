//! Atomic duplicator counters.
//!
//! Monotonic display counters only, so every access uses `Relaxed`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct StatsInner {
    inbound_requests: AtomicU64,
    primary_errors: AtomicU64,
    mirrors_dispatched: AtomicU64,
    mirrors_succeeded: AtomicU64,
    mirrors_failed: AtomicU64,
    mirrors_skipped: AtomicU64,
    mirrors_panicked: AtomicU64,
}

/// Thread-safe counters shared by the handler and mirror tasks. Cheap to
/// clone (Arc).
#[derive(Clone, Default)]
pub struct DuplicatorStats {
    inner: Arc<StatsInner>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub inbound_requests: u64,
    pub primary_errors: u64,
    pub mirrors_dispatched: u64,
    pub mirrors_succeeded: u64,
    pub mirrors_failed: u64,
    pub mirrors_skipped: u64,
    pub mirrors_panicked: u64,
}

impl DuplicatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_inbound(&self) {
        self.inner.inbound_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_primary_errors(&self) {
        self.inner.primary_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirrors_dispatched(&self) {
        self.inner.mirrors_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirrors_succeeded(&self) {
        self.inner.mirrors_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirrors_failed(&self) {
        self.inner.mirrors_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirrors_skipped(&self) {
        self.inner.mirrors_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mirrors_panicked(&self) {
        self.inner.mirrors_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let i = &self.inner;
        StatsSnapshot {
            inbound_requests: i.inbound_requests.load(Ordering::Relaxed),
            primary_errors: i.primary_errors.load(Ordering::Relaxed),
            mirrors_dispatched: i.mirrors_dispatched.load(Ordering::Relaxed),
            mirrors_succeeded: i.mirrors_succeeded.load(Ordering::Relaxed),
            mirrors_failed: i.mirrors_failed.load(Ordering::Relaxed),
            mirrors_skipped: i.mirrors_skipped.load(Ordering::Relaxed),
            mirrors_panicked: i.mirrors_panicked.load(Ordering::Relaxed),
        }
    }
}
