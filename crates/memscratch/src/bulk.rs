//! Bounds-checked bulk byte transfer.
//!
//! Every chunk-to-chunk, input-to-chunk, and chunk-to-output transfer in
//! this crate goes through [`copy`], which validates both extents before
//! touching either slice. There is no unchecked pointer arithmetic anywhere
//! in the workspace.

/// Copy `len` bytes from `src[src_off..src_off + len]` into
/// `dst[dst_off..dst_off + len]`.
///
/// # Panics
///
/// Panics if either range falls outside its slice. Callers pass extents they
/// have already sized, so a panic here signals a bug in the caller, not bad
/// input.
pub fn copy(src: &[u8], src_off: usize, dst: &mut [u8], dst_off: usize, len: usize) {
    assert!(
        src_off <= src.len() && len <= src.len() - src_off,
        "source range {src_off}..+{len} outside slice of {} bytes",
        src.len()
    );
    assert!(
        dst_off <= dst.len() && len <= dst.len() - dst_off,
        "destination range {dst_off}..+{len} outside slice of {} bytes",
        dst.len()
    );
    dst[dst_off..dst_off + len].copy_from_slice(&src[src_off..src_off + len]);
}
