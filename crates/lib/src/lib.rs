//! assetmap-lib: asset manifest generation for bundler builds
//!
//! This crate maps the logical names of build inputs to the hashed file
//! names a bundler writes:
//! - `AssetsManifest`: the ordered entry table and the build lifecycle
//! - `Reconciler`: original-name discovery from several build sources
//! - `Hooks`: customize/transform/done extension points
//! - `ManifestLock`: file lock around merging with an existing manifest

pub mod consts;
pub mod error;
pub mod hooks;
pub mod host;
pub mod lock;
pub mod manifest;
pub mod merge;
pub mod options;
pub mod output;
pub mod reconcile;
pub mod util;

pub use error::ManifestError;
pub use manifest::AssetsManifest;
pub use options::ManifestOptions;
