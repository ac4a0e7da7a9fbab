//! Registry counters
//!
//! - Counters only, monotonic
//! - Reset only when the registry is created
//! - Lock-free: relaxed atomics

use std::sync::atomic::{AtomicU64, Ordering};

/// I/O events performed by a `DatabaseHandleRegistry`.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    /// Seed directories copied into the storage root
    seed_copies: AtomicU64,
    /// Empty databases created
    creates: AtomicU64,
    /// Stores opened (data file replayed)
    store_opens: AtomicU64,
    /// Stores closed by the last release
    store_closes: AtomicU64,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_seed_copies(&self) {
        self.seed_copies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_creates(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_store_opens(&self) {
        self.store_opens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_store_closes(&self) {
        self.store_closes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn seed_copies(&self) -> u64 {
        self.seed_copies.load(Ordering::Relaxed)
    }

    pub fn creates(&self) -> u64 {
        self.creates.load(Ordering::Relaxed)
    }

    pub fn store_opens(&self) -> u64 {
        self.store_opens.load(Ordering::Relaxed)
    }

    pub fn store_closes(&self) -> u64 {
        self.store_closes.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            seed_copies: self.seed_copies(),
            creates: self.creates(),
            store_opens: self.store_opens(),
            store_closes: self.store_closes(),
        }
    }
}

/// Counter values at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub seed_copies: u64,
    pub creates: u64,
    pub store_opens: u64,
    pub store_closes: u64,
}
