//! POSIX shared memory segments and memory maps.
//!
//! This crate owns the OS-facing half of the basalt bus: named shared
//! memory objects (`shm_open`/`shm_unlink`) and mappings of those objects
//! into the process address space. Everything here is byte-oriented; the
//! ring buffer layout on top of it lives in `basalt-icc`.
//!
//! # Naming
//!
//! Segment names follow the POSIX IPC convention: they begin with `/` and
//! contain no further `/`. The backing object is visible under `/dev/shm`
//! and outlives any single process; it must be removed explicitly with
//! [`remove`] once no process needs it anymore.

mod error;
mod map;
mod segment;

pub use error::ShmError;
pub use map::Map;
pub use segment::{Access, IPC_DIR, Segment, exists, ipc_path, normalize_name, remove};
