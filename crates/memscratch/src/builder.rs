//! Pooled, chunked string accumulation.
//!
//! [`PooledStringBuilder`] grows by renting one 256-byte chunk at a time
//! from a [`ChunkPool`] instead of reallocating a contiguous buffer, and
//! gives every chunk back on `clear`/`dispose`. Growth is strictly
//! incremental -- one chunk per 256 bytes, never a doubling strategy -- so
//! per-builder waste is bounded by a single chunk and pool accounting stays
//! trivial.
//!
//! The builder accumulates UTF-8 text. Appends always transfer whole scalar
//! values, so the concatenation of all chunk contents is valid UTF-8 even
//! when an individual scalar's bytes straddle a chunk boundary.

use std::fmt;

use thiserror::Error;

use crate::bulk;
use crate::pool::{Chunk, ChunkPool, CHUNK_SIZE};

/// Initial capacity of the chunk list, chosen so builders up to 8 KiB never
/// reallocate the list itself.
const INITIAL_CHUNK_LIST: usize = 32;

/// Returned chunks are scrubbed in debug builds only.
const CLEAR_RETURNED: bool = cfg!(debug_assertions);

/// Error raised by builder operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    /// The builder (or a source builder) was used after [`dispose`].
    ///
    /// [`dispose`]: PooledStringBuilder::dispose
    #[error("pooled string builder used after dispose")]
    Disposed,
}

/// An append-only UTF-8 accumulator backed by pooled fixed-size chunks.
///
/// The builder is thread-confined: it has no internal synchronization and
/// is meant to live on one thread for the duration of a build. Appending a
/// builder to itself is rejected at compile time (`push_builder` borrows
/// the source while the receiver is borrowed mutably).
///
/// ```
/// use memscratch::PooledStringBuilder;
///
/// let mut b = PooledStringBuilder::new();
/// b.push('a')?.push('b')?.push('c')?.push_str("test")?;
/// assert_eq!(b.build()?, "abctest");
/// # Ok::<(), memscratch::BuilderError>(())
/// ```
pub struct PooledStringBuilder<'p> {
    pool: &'p ChunkPool,
    /// `None` is the terminal, disposed state.
    chunks: Option<Vec<Chunk>>,
    len: usize,
}

impl PooledStringBuilder<'static> {
    /// Create an empty builder against the process-wide shared pool.
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(ChunkPool::shared())
    }
}

impl<'p> PooledStringBuilder<'p> {
    /// Create an empty builder renting from `pool`.
    #[must_use]
    pub fn new_in(pool: &'p ChunkPool) -> Self {
        Self {
            pool,
            chunks: Some(Vec::with_capacity(INITIAL_CHUNK_LIST)),
            len: 0,
        }
    }

    /// Total logical length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the builder holds no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one character.
    pub fn push(&mut self, c: char) -> Result<&mut Self, BuilderError> {
        let mut enc = [0_u8; 4];
        let encoded = c.encode_utf8(&mut enc).as_bytes();
        self.append_bytes(encoded)?;
        Ok(self)
    }

    /// Append `count` copies of one character. A zero count is a no-op.
    pub fn push_repeat(&mut self, c: char, count: usize) -> Result<&mut Self, BuilderError> {
        if self.chunks.is_none() {
            return Err(BuilderError::Disposed);
        }
        let mut enc = [0_u8; 4];
        let encoded = c.encode_utf8(&mut enc).as_bytes();
        for _ in 0..count {
            self.append_bytes(encoded)?;
        }
        Ok(self)
    }

    /// Append a string slice, splitting the copy across chunk boundaries as
    /// needed. The empty string is a no-op.
    pub fn push_str(&mut self, s: &str) -> Result<&mut Self, BuilderError> {
        if self.chunks.is_none() {
            return Err(BuilderError::Disposed);
        }
        if !s.is_empty() {
            self.append_bytes(s.as_bytes())?;
        }
        Ok(self)
    }

    /// Append the logical content of another builder, chunk by chunk,
    /// ignoring the unused tail of its last chunk.
    ///
    /// Fails with [`BuilderError::Disposed`] if either builder has been
    /// disposed.
    pub fn push_builder(&mut self, other: &PooledStringBuilder<'_>) -> Result<&mut Self, BuilderError> {
        if self.chunks.is_none() {
            return Err(BuilderError::Disposed);
        }
        let other_chunks = other.chunks.as_ref().ok_or(BuilderError::Disposed)?;
        let mut remaining = other.len;
        for chunk in other_chunks {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(CHUNK_SIZE);
            self.append_bytes(&chunk[..take])?;
            remaining -= take;
        }
        Ok(self)
    }

    /// Copy this builder's content into a new builder renting from the same
    /// pool.
    pub fn duplicate(&self) -> Result<PooledStringBuilder<'p>, BuilderError> {
        let mut copy = PooledStringBuilder::new_in(self.pool);
        copy.push_builder(self)?;
        Ok(copy)
    }

    /// Return every chunk to the pool and reset to empty. The builder
    /// remains usable; the chunk list keeps its capacity.
    pub fn clear(&mut self) -> Result<&mut Self, BuilderError> {
        let pool = self.pool;
        let chunks = self.chunks.as_mut().ok_or(BuilderError::Disposed)?;
        for chunk in chunks.drain(..) {
            pool.give_back(chunk, CLEAR_RETURNED);
        }
        self.len = 0;
        Ok(self)
    }

    /// Materialize the accumulated text as one contiguous `String` of
    /// exactly [`len`](Self::len) bytes.
    pub fn build(&self) -> Result<String, BuilderError> {
        let chunks = self.chunks.as_ref().ok_or(BuilderError::Disposed)?;
        if self.len == 0 {
            return Ok(String::new());
        }
        let mut out = vec![0_u8; self.len];
        for (i, chunk) in chunks.iter().enumerate() {
            let offset = i * CHUNK_SIZE;
            let take = CHUNK_SIZE.min(self.len - offset);
            bulk::copy(&chunk[..], 0, &mut out, offset, take);
        }
        Ok(String::from_utf8(out).expect("appends only transfer whole UTF-8 scalars"))
    }

    /// Return all chunks to the pool and enter the terminal state.
    ///
    /// Idempotent: repeated calls are no-ops. Every other operation fails
    /// with [`BuilderError::Disposed`] afterwards. Dropping the builder
    /// calls `dispose` as a fallback, but the explicit call is preferred so
    /// chunks go back to the pool at a predictable point.
    pub fn dispose(&mut self) {
        let Some(chunks) = self.chunks.take() else {
            return;
        };
        for chunk in chunks {
            self.pool.give_back(chunk, CLEAR_RETURNED);
        }
        self.len = 0;
    }

    /// Bulk-append raw bytes of already-validated UTF-8 fragments, renting
    /// a new chunk exactly when the write cursor crosses a chunk boundary.
    fn append_bytes(&mut self, mut src: &[u8]) -> Result<(), BuilderError> {
        let pool = self.pool;
        let chunks = self.chunks.as_mut().ok_or(BuilderError::Disposed)?;
        while !src.is_empty() {
            let offset = self.len % CHUNK_SIZE;
            if offset == 0 {
                chunks.push(pool.rent());
            }
            let last = chunks.len() - 1;
            let take = (CHUNK_SIZE - offset).min(src.len());
            bulk::copy(src, 0, &mut chunks[last][..], offset, take);
            src = &src[take..];
            self.len += take;
        }
        debug_assert_eq!(chunks.len(), self.len.div_ceil(CHUNK_SIZE));
        Ok(())
    }
}

impl Default for PooledStringBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PooledStringBuilder<'_> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Write for PooledStringBuilder<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s).map(|_| ()).map_err(|_| fmt::Error)
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.push(c).map(|_| ()).map_err(|_| fmt::Error)
    }
}

impl fmt::Debug for PooledStringBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledStringBuilder")
            .field("len", &self.len)
            .field("disposed", &self.chunks.is_none())
            .finish()
    }
}
