//! Option validation beyond what deserialization enforces.

use thiserror::Error;

use super::types::{EntrypointsKey, ManifestOptions, Space};
use crate::consts::MAX_SPACE;
use crate::util::hash::is_supported;
use crate::util::path::normalize;
use crate::util::warn::warn_once;

/// Configuration errors. Always fatal: the build must not proceed.
#[derive(Debug, Error)]
pub enum OptionsError {
  #[error("invalid manifest options: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to read options file: {0}")]
  Read(#[source] std::io::Error),

  #[error("invalid manifest options: output must not be empty")]
  EmptyOutput,

  #[error("invalid manifest options: space must be at most {MAX_SPACE}, got {0}")]
  SpaceTooWide(usize),

  #[error("invalid manifest options: entrypointsKey must not be empty")]
  EmptyEntrypointsKey,

  #[error("invalid manifest options: integrityPropertyName must not be empty")]
  EmptyIntegrityPropertyName,
}

impl ManifestOptions {
  /// Parse options from JSON text.
  pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
    serde_json::from_str(json).map_err(OptionsError::Parse)
  }

  /// Parse options from a JSON value.
  pub fn from_value(value: serde_json::Value) -> Result<Self, OptionsError> {
    serde_json::from_value(value).map_err(OptionsError::Parse)
  }

  /// Load options from a JSON file.
  pub fn load(path: &std::path::Path) -> Result<Self, OptionsError> {
    let content = std::fs::read_to_string(path).map_err(OptionsError::Read)?;
    Self::from_json_str(&content)
  }

  /// Check the record and normalize it for use.
  ///
  /// Unsupported integrity algorithms are dropped with a one-time warning.
  pub fn validate(mut self) -> Result<Self, OptionsError> {
    if self.output.as_os_str().is_empty() {
      return Err(OptionsError::EmptyOutput);
    }
    self.output = normalize(&self.output);

    match &self.space {
      Space::Width(n) if *n > MAX_SPACE => return Err(OptionsError::SpaceTooWide(*n)),
      Space::Text(s) if s.chars().count() > MAX_SPACE => return Err(OptionsError::SpaceTooWide(s.chars().count())),
      _ => {}
    }

    if matches!(&self.entrypoints_key, EntrypointsKey::Key(k) if k.is_empty()) {
      return Err(OptionsError::EmptyEntrypointsKey);
    }

    if self.integrity_property_name.is_empty() {
      return Err(OptionsError::EmptyIntegrityPropertyName);
    }

    self.integrity_hashes.retain(|alg| {
      let supported = is_supported(alg);
      if !supported {
        warn_once(format!(
          "integrity hash algorithm \"{}\" is not supported and will be ignored",
          alg
        ));
      }
      supported
    });

    Ok(self)
  }
}
