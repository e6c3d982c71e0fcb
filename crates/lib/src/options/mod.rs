//! Manifest configuration.
//!
//! [`ManifestOptions`] is deserialized from JSON (or built in code), passed
//! through the `options` hook, then validated once before the manifest is
//! used. After validation it is not changed again.

mod types;
mod validate;

pub use types::*;
pub use validate::OptionsError;
