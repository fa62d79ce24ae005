//! Deterministic adapters for tests: a pinned clock and an in-memory tree.

pub mod clock;
pub mod filesystem;

pub use clock::FixedClock;
pub use filesystem::MemoryFileSystem;
