//! Subresource integrity digests.
//!
//! An SRI string is a space separated list of `<alg>-<base64 digest>` tokens,
//! e.g. `"sha256-47DEQpj8... sha384-OLBgp1GsljhM..."`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Digest algorithms this crate can compute.
pub const SUPPORTED_ALGORITHMS: &[&str] = &["sha256", "sha384", "sha512"];

/// Whether `algorithm` is one of [`SUPPORTED_ALGORITHMS`].
pub fn is_supported(algorithm: &str) -> bool {
  SUPPORTED_ALGORITHMS.contains(&algorithm)
}

/// Compute a single `<alg>-<base64>` token, or `None` for unknown algorithms.
pub fn digest(algorithm: &str, content: &[u8]) -> Option<String> {
  let raw = match algorithm {
    "sha256" => Sha256::digest(content).to_vec(),
    "sha384" => Sha384::digest(content).to_vec(),
    "sha512" => Sha512::digest(content).to_vec(),
    _ => return None,
  };
  Some(format!("{}-{}", algorithm, STANDARD.encode(raw)))
}

/// Compute the SRI string for `content` over every supported algorithm given.
///
/// Returns an empty string when no algorithm is usable.
pub fn sri_hash<S: AsRef<str>>(algorithms: &[S], content: &[u8]) -> String {
  algorithms
    .iter()
    .filter_map(|alg| digest(alg.as_ref(), content))
    .collect::<Vec<_>>()
    .join(" ")
}
