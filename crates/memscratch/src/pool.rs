//! Fixed-size chunk pool shared by string builders.
//!
//! Builders rent 256-byte chunks one at a time and give every chunk back on
//! clear/dispose. The free list is bounded: surplus returns are dropped
//! rather than retained, so a burst of large builds cannot pin memory
//! forever. A process-wide shared pool is available via
//! [`ChunkPool::shared`]; tests that need deterministic accounting create
//! their own pool and build against it with
//! [`PooledStringBuilder::new_in`](crate::builder::PooledStringBuilder::new_in).

use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::stats::{AtomicPoolStats, PoolStats};

/// Capacity of one pooled chunk, in bytes.
pub const CHUNK_SIZE: usize = 256;

/// Default cap on retained free chunks per pool.
pub const DEFAULT_MAX_POOLED: usize = 1024;

/// A fixed-capacity chunk of pooled byte storage.
///
/// Owned exclusively by one builder while rented; contents are only
/// meaningful up to the owner's write cursor.
pub type Chunk = Box<[u8; CHUNK_SIZE]>;

/// Thread-safe free list of fixed-size chunks.
pub struct ChunkPool {
    free: Mutex<Vec<Chunk>>,
    max_pooled: usize,
    stats: AtomicPoolStats,
}

static SHARED: OnceLock<ChunkPool> = OnceLock::new();

impl ChunkPool {
    /// Create a pool retaining at most `max_pooled` free chunks.
    #[must_use]
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_pooled,
            stats: AtomicPoolStats::new(),
        }
    }

    /// The process-wide shared pool used by
    /// [`PooledStringBuilder::new`](crate::builder::PooledStringBuilder::new).
    #[must_use]
    pub fn shared() -> &'static ChunkPool {
        SHARED.get_or_init(|| ChunkPool::new(DEFAULT_MAX_POOLED))
    }

    /// Rent one chunk, reusing a free one when available.
    pub fn rent(&self) -> Chunk {
        let reused = self.free.lock().pop();
        match reused {
            Some(chunk) => {
                self.stats.record_reuse();
                chunk
            }
            None => {
                self.stats.record_alloc();
                Box::new([0_u8; CHUNK_SIZE])
            }
        }
    }

    /// Return a chunk to the free list, scrubbing its contents first when
    /// `clear` is set. If the list is at capacity the chunk is dropped.
    pub fn give_back(&self, mut chunk: Chunk, clear: bool) {
        if clear {
            chunk.fill(0);
        }
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(chunk);
        } else {
            self.stats.record_discard();
            tracing::trace!(max_pooled = self.max_pooled, "chunk pool full, dropping chunk");
        }
    }

    /// Number of free chunks currently retained.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.free.lock().len()
    }

    /// Snapshot of rent/return activity.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Reset the activity counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Drop every retained free chunk, releasing its memory.
    pub fn drain(&self) {
        self.free.lock().clear();
    }
}

impl Default for ChunkPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rent_and_give_back_roundtrip() {
        let pool = ChunkPool::default();
        let chunk = pool.rent();
        assert_eq!(pool.pooled(), 0);
        pool.give_back(chunk, false);
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn rent_prefers_free_list() {
        let pool = ChunkPool::default();
        pool.give_back(Box::new([0; CHUNK_SIZE]), false);
        let _ = pool.rent();
        let snap = pool.stats();
        assert_eq!(snap.reused, 1);
        assert_eq!(snap.allocated, 0);
    }

    #[test]
    fn fresh_allocation_when_empty() {
        let pool = ChunkPool::default();
        let _ = pool.rent();
        let snap = pool.stats();
        assert_eq!(snap.reused, 0);
        assert_eq!(snap.allocated, 1);
    }

    #[test]
    fn give_back_clears_when_asked() {
        let pool = ChunkPool::default();
        let mut chunk = pool.rent();
        chunk[0] = 0xAB;
        chunk[CHUNK_SIZE - 1] = 0xCD;
        pool.give_back(chunk, true);
        let chunk = pool.rent();
        assert!(chunk.iter().all(|&b| b == 0));
    }

    #[test]
    fn give_back_preserves_when_not_asked() {
        let pool = ChunkPool::default();
        let mut chunk = pool.rent();
        chunk[7] = 42;
        pool.give_back(chunk, false);
        let chunk = pool.rent();
        assert_eq!(chunk[7], 42);
    }

    #[test]
    fn retention_is_bounded() {
        let pool = ChunkPool::new(2);
        pool.give_back(Box::new([0; CHUNK_SIZE]), false);
        pool.give_back(Box::new([0; CHUNK_SIZE]), false);
        pool.give_back(Box::new([0; CHUNK_SIZE]), false); // dropped
        assert_eq!(pool.pooled(), 2);
        assert_eq!(pool.stats().discarded, 1);
    }

    #[test]
    fn drain_empties_free_list() {
        let pool = ChunkPool::default();
        pool.give_back(Box::new([0; CHUNK_SIZE]), false);
        pool.give_back(Box::new([0; CHUNK_SIZE]), false);
        assert_eq!(pool.pooled(), 2);
        pool.drain();
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn shared_pool_is_a_singleton() {
        let a: *const ChunkPool = ChunkPool::shared();
        let b: *const ChunkPool = ChunkPool::shared();
        assert_eq!(a, b);
    }

    #[test]
    fn accounting_over_mixed_activity() {
        let pool = ChunkPool::new(1);
        let a = pool.rent();
        let b = pool.rent();
        pool.give_back(a, false);
        pool.give_back(b, false); // over capacity, dropped
        let _ = pool.rent();
        let snap = pool.stats();
        assert_eq!(snap.allocated, 2);
        assert_eq!(snap.discarded, 1);
        assert_eq!(snap.reused, 1);
    }

    #[test]
    fn reset_stats_zeroes_counters() {
        let pool = ChunkPool::default();
        let _ = pool.rent();
        pool.reset_stats();
        assert_eq!(pool.stats(), PoolStats::default());
    }
}
