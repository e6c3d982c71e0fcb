//! Original-name reconciliation.
//!
//! During a build an asset's logical name is observed from several sources
//! that disagree on shape and arrive in no particular order:
//!
//! 1. loader emission: a module's loader writes `images/logo.1a2b.png` for a
//!    request of `./src/logo.png`;
//! 2. chunk file lists: chunk `main` owns `main.9c68.js` and `main.9c68.css`;
//! 3. asset-module metadata: the host records which module produced a file.
//!
//! Each observation lands in an [`AssetNameIndex`] as `original -> hashed`.
//! When the final asset list is reported, every asset looks up all originals
//! that point at it. Several originals for one file are all kept: each becomes
//! its own manifest entry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, trace};

use crate::host::Asset;
use crate::util::ext::extension;
use crate::util::path::{basename, dirname, join_name, relative, to_slash};

/// Observed `original name -> hashed file name` associations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetNameIndex {
  names: IndexMap<String, String>,
}

impl AssetNameIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record that `original` resolved to `hashed`. A later observation of the
  /// same original replaces the earlier one.
  pub fn record(&mut self, original: impl Into<String>, hashed: impl Into<String>) {
    let original = original.into();
    let hashed = hashed.into();
    trace!(original = %original, hashed = %hashed, "recorded asset name");
    self.names.insert(original, hashed);
  }

  pub fn get(&self, original: &str) -> Option<&str> {
    self.names.get(original).map(String::as_str)
  }

  /// Every original name recorded for `hashed`, in first-seen order.
  pub fn originals_of(&self, hashed: &str) -> Vec<String> {
    self
      .names
      .iter()
      .filter(|(_, h)| h.as_str() == hashed)
      .map(|(o, _)| o.clone())
      .collect()
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn clear(&mut self) {
    self.names.clear();
  }
}

/// Builds and queries the [`AssetNameIndex`] for one manifest.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
  index: AssetNameIndex,
  context: PathBuf,
  context_relative_keys: bool,
  file_ext_regex: Option<Regex>,
  hot_update_regex: Option<Regex>,
}

impl Reconciler {
  pub fn new(
    context: impl Into<PathBuf>,
    context_relative_keys: bool,
    file_ext_regex: Option<Regex>,
    hot_update_regex: Option<Regex>,
  ) -> Self {
    Self {
      index: AssetNameIndex::new(),
      context: context.into(),
      context_relative_keys,
      file_ext_regex,
      hot_update_regex,
    }
  }

  pub fn index(&self) -> &AssetNameIndex {
    &self.index
  }

  pub fn clear(&mut self) {
    self.index.clear();
  }

  /// Extension of `name` under the configured detection rule.
  pub fn extension(&self, name: &str) -> String {
    extension(name, self.file_ext_regex.as_ref())
  }

  /// Whether `name` looks like a hot-update file.
  pub fn is_hot_update_name(&self, name: &str) -> bool {
    self.hot_update_regex.as_ref().is_some_and(|re| re.is_match(name))
  }

  /// Whether `asset` is a hot-update file by info flag or by name.
  pub fn is_hot_update(&self, asset: &Asset) -> bool {
    asset.info.is_hot_update() || self.is_hot_update_name(&asset.name)
  }

  fn context_relative(&self, path: &Path) -> String {
    to_slash(&relative(&self.context, path))
  }

  /// A loader emitted `output_name` while processing the module requested as
  /// `user_request`.
  pub fn record_from_loader_emission(&mut self, output_name: &str, user_request: &Path) {
    if self.is_hot_update_name(output_name) {
      debug!(name = %output_name, "ignoring hot-update emission");
      return;
    }

    let original = if self.context_relative_keys {
      self.context_relative(user_request)
    } else {
      let request = user_request.to_string_lossy();
      join_name(dirname(output_name), basename(&request))
    };
    self.index.record(original, output_name);
  }

  /// Chunk `chunk_name` produced `files`. Each file is recorded under
  /// `chunk_name + extension(file)`, skipping hot-update files.
  pub fn record_from_chunk_asset_list(&mut self, chunk_name: &str, files: &[String], hot_update_files: &HashSet<String>) {
    for file in files {
      if hot_update_files.contains(file) || self.is_hot_update_name(file) {
        continue;
      }
      let key = format!("{}{}", chunk_name, self.extension(file));
      self.index.record(key, file.as_str());
    }
  }

  /// The host's asset-module mode wrote `final_name` for `user_request`.
  pub fn record_from_asset_module_metadata(&mut self, final_name: &str, user_request: &Path, source_filename: Option<&str>) {
    if self.is_hot_update_name(final_name) {
      return;
    }

    let original = if self.context_relative_keys {
      match source_filename {
        Some(hint) => hint.replace('\\', "/"),
        None => self.context_relative(user_request),
      }
    } else {
      let request = user_request.to_string_lossy();
      join_name(dirname(final_name), basename(&request))
    };
    self.index.record(original, final_name);
  }

  /// Reverse lookup: all original names recorded for `final_name`.
  pub fn find_original_names_for(&self, final_name: &str) -> Vec<String> {
    self.index.originals_of(final_name)
  }

  /// Manifest keys for `asset`.
  ///
  /// Falls back to the asset's `sourceFilename` hint (kept context-relative or
  /// reduced to its basename) and finally to the asset's own name.
  pub fn resolve_names(&self, asset: &Asset) -> Vec<String> {
    let found = self.find_original_names_for(&asset.name);
    if !found.is_empty() {
      return found;
    }

    let name = match asset.info.source_filename.as_deref() {
      Some(hint) if self.context_relative_keys => hint.replace('\\', "/"),
      Some(hint) => basename(hint).to_string(),
      None => asset.name.clone(),
    };
    vec![name]
  }
}
