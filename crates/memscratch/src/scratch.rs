//! Per-thread reusable scratch spans.
//!
//! [`ScratchRegion`] hands out short-lived typed views into a growable
//! backing buffer that lives in thread-local storage, keyed by a zero-sized
//! tag type. The buffer is allocated lazily, only ever grows (in 64 KiB
//! quanta), and is reused across calls, so steady-state acquisition does no
//! heap allocation at all -- a shadow stack without the size limit of the
//! real one.
//!
//! One scope may be open per `(thread, tag)` pair at a time; a second
//! acquisition fails with [`ScratchError::AlreadyInUse`] until the first
//! scope is released. Distinct tags are fully independent and may be open
//! concurrently on the same thread.
//!
//! Contents of the backing buffer are **not** zeroed on reuse in release
//! builds. Read only what you wrote within the current scope. Debug builds
//! zero the carved region on every acquisition to flush out stale reads.
//!
//! ```
//! use memscratch::ScratchRegion;
//!
//! struct Resampler; // tag: one backing buffer per thread for this call-site
//!
//! let mut scope = ScratchRegion::<Resampler>::get::<u32>(8)?;
//! let view = scope.view();
//! view[0] = 7;
//! assert_eq!(view.len(), 8);
//! scope.release();
//! # Ok::<(), memscratch::ScratchError>(())
//! ```

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::mem;

use thiserror::Error;

pub use bytemuck::Pod;

/// Growth quantum for backing buffers: capacities are always rounded up to
/// a multiple of 64 KiB.
pub const GROWTH_QUANTUM: usize = 64 * 1024;

/// Maximum element alignment a view may require. The backing buffer is a
/// `Vec` of 16-byte blocks and view offsets are rounded up to the element
/// alignment, so anything up to the block alignment carves cleanly.
pub const MAX_ALIGN: usize = mem::align_of::<Block>();

/// Backing storage unit. `u128` gives the buffer 16-byte alignment without
/// any unsafe code.
type Block = u128;

const BLOCK_SIZE: usize = mem::size_of::<Block>();

/// Error raised by scratch acquisition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScratchError {
    /// A scope for this `(thread, tag)` pair is already open. Release it
    /// before acquiring again.
    #[error("scratch region is already in use on this thread")]
    AlreadyInUse,

    /// The requested sizes do not fit in `usize`. Raised before the guard
    /// is touched, so a subsequent valid request still succeeds.
    #[error("scratch request overflows usize ({count} elements of {elem_size} bytes)")]
    RequestTooLarge {
        /// Requested element count.
        count: usize,
        /// Size of one element in bytes.
        elem_size: usize,
    },

    /// The element type requires stricter alignment than the backing
    /// buffer guarantees.
    #[error("element alignment {align} exceeds the supported maximum of {max}")]
    AlignmentTooLarge {
        /// Alignment of the requested element type.
        align: usize,
        /// Maximum supported alignment ([`MAX_ALIGN`]).
        max: usize,
    },
}

#[derive(Default)]
struct Slot {
    in_use: bool,
    blocks: Vec<Block>,
}

thread_local! {
    static REGIONS: RefCell<HashMap<TypeId, Slot>> = RefCell::new(HashMap::new());
}

/// Per-thread scratch storage selected by the zero-sized tag type `Tag`.
///
/// The tag carries no runtime value; it exists so call sites (or
/// subsystems) can keep separate backing buffers without their `get` calls
/// interfering with one another while sharing the mechanism.
pub struct ScratchRegion<Tag: 'static> {
    _tag: PhantomData<Tag>,
}

impl<Tag: 'static> ScratchRegion<Tag> {
    /// Open a scope carving one typed view of `count` elements.
    ///
    /// A zero-byte request returns an empty view but still engages the
    /// in-use guard, so misuse is detected uniformly.
    pub fn get<T: Pod>(count: usize) -> Result<ScratchScope<Tag, (T,)>, ScratchError> {
        let (v1, total) = layout::<T>(0, count)?;
        let blocks = Self::open(total, quantum_target(total)?)?;
        Ok(ScratchScope::new(blocks, [v1, (0, 0), (0, 0)]))
    }

    /// Open a scope carving two typed views, contiguous in request order.
    pub fn get2<T1: Pod, T2: Pod>(
        count1: usize,
        count2: usize,
    ) -> Result<ScratchScope<Tag, (T1, T2)>, ScratchError> {
        let (v1, cursor) = layout::<T1>(0, count1)?;
        let (v2, total) = layout::<T2>(cursor, count2)?;
        let blocks = Self::open(total, quantum_target(total)?)?;
        Ok(ScratchScope::new(blocks, [v1, v2, (0, 0)]))
    }

    /// Open a scope carving three typed views, contiguous in request order.
    pub fn get3<T1: Pod, T2: Pod, T3: Pod>(
        count1: usize,
        count2: usize,
        count3: usize,
    ) -> Result<ScratchScope<Tag, (T1, T2, T3)>, ScratchError> {
        let (v1, cursor) = layout::<T1>(0, count1)?;
        let (v2, cursor) = layout::<T2>(cursor, count2)?;
        let (v3, total) = layout::<T3>(cursor, count3)?;
        let blocks = Self::open(total, quantum_target(total)?)?;
        Ok(ScratchScope::new(blocks, [v1, v2, v3]))
    }

    /// Engage the guard for this `(thread, Tag)` pair and take the backing
    /// buffer out of thread-local storage, growing it if `total_bytes`
    /// exceeds its capacity. The guard check happens before any growth so a
    /// call that is going to fail never allocates.
    fn open(total_bytes: usize, target_bytes: usize) -> Result<Vec<Block>, ScratchError> {
        let mut blocks = REGIONS.with(|regions| {
            let mut regions = regions.borrow_mut();
            let slot = regions.entry(TypeId::of::<Tag>()).or_default();
            if slot.in_use {
                return Err(ScratchError::AlreadyInUse);
            }
            slot.in_use = true;
            Ok(mem::take(&mut slot.blocks))
        })?;

        if blocks.len() * BLOCK_SIZE < total_bytes {
            let from = blocks.len() * BLOCK_SIZE;
            blocks.resize(target_bytes / BLOCK_SIZE, 0);
            tracing::debug!(
                tag = type_name::<Tag>(),
                from,
                to = target_bytes,
                "scratch backing buffer grown"
            );
        }

        if cfg!(debug_assertions) && total_bytes > 0 {
            bytemuck::cast_slice_mut::<Block, u8>(&mut blocks)[..total_bytes].fill(0);
        }

        Ok(blocks)
    }
}

/// Compute one view's placement: its `(offset, byte_len)` within the
/// backing buffer and the cursor for the next view. Offsets are rounded up
/// to the element alignment; sizes use checked arithmetic throughout.
fn layout<T: Pod>(cursor: usize, count: usize) -> Result<((usize, usize), usize), ScratchError> {
    let elem_size = mem::size_of::<T>();
    let align = mem::align_of::<T>();
    if align > MAX_ALIGN {
        return Err(ScratchError::AlignmentTooLarge {
            align,
            max: MAX_ALIGN,
        });
    }
    let too_large = ScratchError::RequestTooLarge { count, elem_size };
    let bytes = count.checked_mul(elem_size).ok_or(too_large.clone())?;
    let offset = cursor.checked_next_multiple_of(align).ok_or(too_large.clone())?;
    let end = offset.checked_add(bytes).ok_or(too_large)?;
    Ok(((offset, bytes), end))
}

/// Round a non-zero total up to the next multiple of [`GROWTH_QUANTUM`].
fn quantum_target(total_bytes: usize) -> Result<usize, ScratchError> {
    if total_bytes == 0 {
        return Ok(0);
    }
    total_bytes
        .checked_next_multiple_of(GROWTH_QUANTUM)
        .ok_or(ScratchError::RequestTooLarge {
            count: total_bytes,
            elem_size: 1,
        })
}

/// A guarded borrow of one scratch region.
///
/// Views are obtained through [`view`](ScratchScope::view) /
/// [`views`](ScratchScope::views) and cannot outlive the scope. Dropping
/// the scope (or calling [`release`](ScratchScope::release), which is
/// preferred for clarity) returns the backing buffer to thread-local
/// storage and frees the guard. Holding a scope without releasing it blocks
/// every further `get` for the same tag on this thread.
#[must_use = "holding the scope keeps the scratch region borrowed; drop or release() it"]
pub struct ScratchScope<Tag: 'static, Views> {
    blocks: Vec<Block>,
    /// `(byte offset, byte length)` per carved view, in request order.
    ranges: [(usize, usize); 3],
    _tag: PhantomData<Tag>,
    _views: PhantomData<Views>,
    /// Scopes must stay on the thread whose storage they borrowed.
    _thread_confined: PhantomData<*const ()>,
}

impl<Tag: 'static, Views> std::fmt::Debug for ScratchScope<Tag, Views> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchScope")
            .field("tag", &type_name::<Tag>())
            .field("ranges", &self.ranges)
            .finish_non_exhaustive()
    }
}

impl<Tag: 'static, Views> ScratchScope<Tag, Views> {
    fn new(blocks: Vec<Block>, ranges: [(usize, usize); 3]) -> Self {
        Self {
            blocks,
            ranges,
            _tag: PhantomData,
            _views: PhantomData,
            _thread_confined: PhantomData,
        }
    }

    /// Close the scope, releasing the guard for this `(thread, Tag)` pair.
    /// Equivalent to dropping the scope.
    pub fn release(self) {}

    fn bytes(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.blocks)
    }
}

impl<Tag: 'static, T: Pod> ScratchScope<Tag, (T,)> {
    /// The carved typed view.
    pub fn view(&mut self) -> &mut [T] {
        let (offset, len) = self.ranges[0];
        cast_view(&mut self.bytes()[offset..offset + len])
    }
}

impl<Tag: 'static, T1: Pod, T2: Pod> ScratchScope<Tag, (T1, T2)> {
    /// Both carved views, in request order. They never overlap.
    pub fn views(&mut self) -> (&mut [T1], &mut [T2]) {
        let [(o1, b1), (o2, b2), _] = self.ranges;
        let (head, tail) = self.bytes().split_at_mut(o2);
        (cast_view(&mut head[o1..o1 + b1]), cast_view(&mut tail[..b2]))
    }
}

impl<Tag: 'static, T1: Pod, T2: Pod, T3: Pod> ScratchScope<Tag, (T1, T2, T3)> {
    /// All three carved views, in request order. They never overlap.
    pub fn views(&mut self) -> (&mut [T1], &mut [T2], &mut [T3]) {
        let [(o1, b1), (o2, b2), (o3, b3)] = self.ranges;
        let (head, rest) = self.bytes().split_at_mut(o2);
        let (mid, tail) = rest.split_at_mut(o3 - o2);
        (
            cast_view(&mut head[o1..o1 + b1]),
            cast_view(&mut mid[..b2]),
            cast_view(&mut tail[..b3]),
        )
    }
}

impl<Tag: 'static, Views> Drop for ScratchScope<Tag, Views> {
    fn drop(&mut self) {
        let blocks = mem::take(&mut self.blocks);
        // try_with: during thread teardown the registry may already be
        // gone, in which case the buffer is simply dropped.
        let _ = REGIONS.try_with(|regions| {
            let mut regions = regions.borrow_mut();
            if let Some(slot) = regions.get_mut(&TypeId::of::<Tag>()) {
                slot.blocks = blocks;
                slot.in_use = false;
            }
        });
    }
}

/// Reinterpret a byte range as a typed slice. The caller has already
/// aligned the range start and sized it to a whole number of elements.
fn cast_view<T: Pod>(bytes: &mut [u8]) -> &mut [T] {
    if bytes.is_empty() {
        // An empty byte slice may carry a dangling, 1-aligned pointer;
        // produce the empty slice directly instead of casting it.
        &mut []
    } else {
        bytemuck::cast_slice_mut(bytes)
    }
}
