//! Implementation of the `assetmap check` command.

use std::path::Path;

use anyhow::{Context, Result};

use assetmap_lib::ManifestOptions;

use crate::output::{OutputFormat, Status, print_json, print_stat, print_status};

/// Load and validate an options file, then print the effective configuration.
pub fn cmd_check(config: &Path, format: OutputFormat) -> Result<()> {
  let options = ManifestOptions::load(config)
    .with_context(|| format!("Failed to load options: {}", config.display()))?
    .validate()
    .with_context(|| format!("Invalid options: {}", config.display()))?;

  let summary = options.summary();
  if format.is_json() {
    return print_json(&summary);
  }

  print_status(Status::Success, &format!("Options are valid: {}", config.display()));
  if let Some(fields) = summary.as_object() {
    for (name, value) in fields {
      print_stat(name, &value.to_string());
    }
  }
  Ok(())
}
