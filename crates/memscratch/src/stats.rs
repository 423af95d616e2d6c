//! Atomic usage counters for chunk pools.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of chunk pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Chunks handed out from the free list.
    pub reused: u64,
    /// Chunks freshly allocated because the free list was empty.
    pub allocated: u64,
    /// Chunks dropped on return because the free list was at capacity.
    pub discarded: u64,
}

/// Lock-free counters recorded by the pool on every rent/return.
pub struct AtomicPoolStats {
    reused: AtomicU64,
    allocated: AtomicU64,
    discarded: AtomicU64,
}

impl AtomicPoolStats {
    /// Create new zeroed counters.
    pub fn new() -> Self {
        Self {
            reused: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Take a snapshot of the current counters.
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            reused: self.reused.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.reused.store(0, Ordering::Relaxed);
        self.allocated.store(0, Ordering::Relaxed);
        self.discarded.store(0, Ordering::Relaxed);
    }

    /// Record a rent satisfied from the free list.
    pub fn record_reuse(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rent that had to allocate a fresh chunk.
    pub fn record_alloc(&self) {
        self.allocated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a returned chunk dropped because the free list was full.
    pub fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for AtomicPoolStats {
    fn default() -> Self {
        Self::new()
    }
}
