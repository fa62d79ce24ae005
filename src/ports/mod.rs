//! Port traits defining external boundaries.
//!
//! The lineage core touches the outside world in exactly two places: the
//! wall clock (override expiry) and the filesystem (source trees, artifacts,
//! registries). Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;

pub use clock::Clock;
pub use filesystem::{DirEntry, EntryKind, FileSystem};
