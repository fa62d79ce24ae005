//! Adapter implementations for the port traits.
//!
//! - `live`: real clock and disk.
//! - `fixture`: pinned clock and in-memory tree for deterministic tests.

pub mod fixture;
pub mod live;
