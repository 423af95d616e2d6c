//! # memscratch
//!
//! Memory-reuse primitives for latency-sensitive code.
//!
//! Two independent components:
//!
//! - [`PooledStringBuilder`]: append-only text accumulation over pooled
//!   256-byte chunks. No doubling reallocations; every chunk goes back to
//!   the [`ChunkPool`] on clear/dispose.
//! - [`ScratchRegion`]: a per-thread, per-tag reusable backing buffer
//!   carved into up to three typed, non-overlapping views for the duration
//!   of a guarded scope.
//!
//! Both are strictly thread-confined. Neither operation ever blocks or
//! suspends; cost is proportional to the bytes touched.
#![warn(missing_docs)]

pub mod builder;
pub mod bulk;
pub mod pool;
pub mod scratch;
pub mod stats;

pub use builder::{BuilderError, PooledStringBuilder};
pub use pool::{Chunk, ChunkPool, CHUNK_SIZE};
pub use scratch::{Pod, ScratchError, ScratchRegion, ScratchScope, GROWTH_QUANTUM};
pub use stats::PoolStats;
