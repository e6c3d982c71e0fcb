//! Shared constants.

use std::time::Duration;

/// Name used when registering built-in hook taps and tagging emitted assets.
pub const PLUGIN_NAME: &str = "AssetsManifest";

/// Default manifest file name, relative to the build output directory.
pub const DEFAULT_OUTPUT: &str = "assets-manifest.json";

/// Value substituted for `[name]` in the output path.
pub const OUTPUT_CHUNK_NAME: &str = "assets-manifest";

/// Default key for the entry points block.
pub const DEFAULT_ENTRYPOINTS_KEY: &str = "entrypoints";

/// Default asset info property that carries integrity digests.
pub const DEFAULT_INTEGRITY_PROPERTY: &str = "integrity";

/// Default JSON indentation.
pub const DEFAULT_SPACE: usize = 2;

/// Largest indentation accepted, matching `JSON.stringify`.
pub const MAX_SPACE: usize = 10;

/// Matches `.js`, `.css`, as well as compound `.js.map`, `.css.gz` and `.js.br`.
pub const DEFAULT_FILE_EXT_REGEX: &str = r"(?i)\.\w{2,4}\.(?:map|gz|br)$|\.\w+$";

/// Digest algorithms enabled when `integrityHashes` is omitted.
pub const DEFAULT_INTEGRITY_HASHES: &[&str] = &["sha256", "sha384", "sha512"];

/// Default hot-update file name templates of the host compiler.
pub const DEFAULT_HOT_UPDATE_TEMPLATES: &[&str] = &["[id].[fullhash].hot-update.js", "[runtime].[fullhash].hot-update.json"];

/// How long to keep retrying a held manifest lock before giving up.
pub const LOCK_WAIT: Duration = Duration::from_millis(6000);

/// Delay between lock attempts.
pub const LOCK_RETRY_WAIT: Duration = Duration::from_millis(100);

