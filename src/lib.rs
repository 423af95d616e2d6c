//! Test-only root package for the memscratch workspace.
//!
//! The workspace-level integration tests live under `tests/`; this library
//! target is intentionally empty.
