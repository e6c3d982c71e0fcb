//! Shared utilities.
//!
//! Path and extension helpers, integrity digests, and the warn-once cache.

pub mod ext;
pub mod hash;
pub mod path;
pub mod warn;
