//! End-to-end scenarios exercising both reuse primitives through the
//! public API only.

use std::fmt::Write;

use memscratch::{BuilderError, ChunkPool, PooledStringBuilder, ScratchRegion, CHUNK_SIZE};

#[test]
fn chars_then_string_materializes_in_order() {
    let mut b = PooledStringBuilder::new();
    b.push('a').unwrap().push('b').unwrap().push('c').unwrap();
    b.push_str("test").unwrap();
    assert_eq!(b.build().unwrap(), "abctest");
}

#[test]
fn empty_append_builds_empty_string() {
    let mut b = PooledStringBuilder::new();
    b.push_str("").unwrap();
    assert_eq!(b.build().unwrap(), "");
}

#[test]
fn nested_builders_concatenate() {
    let mut seed = PooledStringBuilder::new();
    seed.push_str("abc").unwrap();
    let mut b = seed.duplicate().unwrap();
    b.push_str("abc").unwrap();
    b.push('a').unwrap().push('b').unwrap().push('c').unwrap();
    assert_eq!(b.build().unwrap(), "abcabcabc");
}

#[test]
fn builder_lifecycle_against_private_pool() {
    let pool = ChunkPool::new(64);
    let mut b = PooledStringBuilder::new_in(&pool);
    write!(b, "{}-{}", "report", 7).unwrap();
    b.push_repeat('.', CHUNK_SIZE).unwrap();
    assert!(b.build().unwrap().starts_with("report-7"));

    b.clear().unwrap();
    assert_eq!(pool.pooled(), 2);
    b.push_str("after clear").unwrap();
    assert_eq!(b.build().unwrap(), "after clear");

    b.dispose();
    b.dispose(); // idempotent
    assert_eq!(b.build().unwrap_err(), BuilderError::Disposed);
    // "after clear" reused one pooled chunk and dispose returned it.
    assert_eq!(pool.pooled(), 2);
}

#[test]
fn big_scratch_round_trip() {
    struct BigAlloc;
    let count = 2 * 1024 * 1024;
    let mut scope = ScratchRegion::<BigAlloc>::get::<u32>(count).unwrap();
    let view = scope.view();
    assert_eq!(view.len(), count);
    for (i, v) in view.iter_mut().enumerate() {
        *v = u32::try_from(i).unwrap();
    }
    for (i, v) in view.iter().enumerate() {
        assert_eq!(*v, u32::try_from(i).unwrap());
    }
}

#[test]
fn scratch_feeds_builder() {
    struct Staging;
    let mut scope = ScratchRegion::<Staging>::get::<u8>(26).unwrap();
    let digits = scope.view();
    for (i, d) in digits.iter_mut().enumerate() {
        *d = b'a' + u8::try_from(i).unwrap();
    }
    let staged = std::str::from_utf8(digits).unwrap().to_owned();
    scope.release();

    let mut b = PooledStringBuilder::new();
    b.push_str(&staged).unwrap();
    assert_eq!(b.build().unwrap(), "abcdefghijklmnopqrstuvwxyz");
}

#[test]
fn scratch_guard_blocks_until_release() {
    struct Guarded;
    let outer = ScratchRegion::<Guarded>::get::<u64>(8).unwrap();
    assert!(ScratchRegion::<Guarded>::get::<u64>(8).is_err());
    outer.release();
    assert!(ScratchRegion::<Guarded>::get::<u64>(8).is_ok());
}
