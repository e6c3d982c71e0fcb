//! Build lifecycle handlers, called by the host in this order:
//!
//! 1. [`handle_before_run`](AssetsManifest::handle_before_run) or
//!    [`handle_watch_run`](AssetsManifest::handle_watch_run)
//! 2. [`handle_this_compilation`](AssetsManifest::handle_this_compilation)
//! 3. [`handle_loader_emit`](AssetsManifest::handle_loader_emit), any number of times
//! 4. [`handle_process_assets_analyse`](AssetsManifest::handle_process_assets_analyse)
//! 5. [`handle_process_assets_report`](AssetsManifest::handle_process_assets_report)
//! 6. [`handle_after_emit`](AssetsManifest::handle_after_emit), once assets are on disk
//! 7. [`handle_done`](AssetsManifest::handle_done)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use super::{AssetsManifest, Emitted};
use crate::error::ManifestError;
use crate::hooks::DoneContext;
use crate::host::{AssetInfo, BuildStats, Compilation};
use crate::lock::ManifestLock;
use crate::merge::{MergeError, deep_merge, read_existing};
use crate::options::MergeMode;
use crate::output::{emitted_asset_name, interpolate, serialize, should_write_to_disk, write_manifest};
use crate::util::hash::sri_hash;

impl AssetsManifest {
  fn is_active(&self) -> bool {
    self.options.enabled && self.compiler.is_some()
  }

  /// A new build is starting.
  pub fn handle_before_run(&mut self) {
    if !self.is_active() {
      return;
    }
    self.reset_build_state();
  }

  /// A watch-mode rebuild is starting.
  pub fn handle_watch_run(&mut self) {
    if !self.is_active() {
      return;
    }
    self.reset_build_state();
  }

  fn reset_build_state(&mut self) {
    debug!("clearing manifest for a new build");
    self.clear();
    self.reconciler.clear();
    self.resolved.clear();
    self.emitted = None;
  }

  /// The host created the compilation this manifest reports on.
  pub fn handle_this_compilation(&mut self) {
    if !self.is_active() {
      return;
    }
    self.reconciler.clear();
    self.resolved.clear();
  }

  /// A loader wrote `output_name` while processing `user_request`.
  pub fn handle_loader_emit(&mut self, output_name: &str, user_request: &Path) {
    if !self.is_active() {
      return;
    }
    self.reconciler.record_from_loader_emission(output_name, user_request);
  }

  /// Names of hot-update assets, by info flag or by file name.
  fn hot_update_files(&self, compilation: &Compilation) -> HashSet<String> {
    compilation
      .assets
      .iter()
      .filter(|asset| self.reconciler.is_hot_update(asset))
      .map(|asset| asset.name.clone())
      .collect()
  }

  /// Record chunk files and asset modules, and compute missing integrity
  /// digests.
  pub fn handle_process_assets_analyse(&mut self, compilation: &mut Compilation) {
    if !self.is_active() {
      return;
    }

    let hot_update = self.hot_update_files(compilation);
    for (chunk, files) in &compilation.assets_by_chunk_name {
      self.reconciler.record_from_chunk_asset_list(chunk, files, &hot_update);
    }
    for module in &compilation.asset_modules {
      self.reconciler.record_from_asset_module_metadata(
        &module.filename,
        &module.user_request,
        module.source_filename.as_deref(),
      );
    }

    if self.options.integrity {
      let property = &self.options.integrity_property_name;
      for asset in compilation.assets.iter_mut() {
        if asset.info.is_manifest() || hot_update.contains(&asset.name) || asset.info.extra.contains_key(property) {
          continue;
        }
        let integrity = sri_hash(&self.options.integrity_hashes, &asset.source);
        asset.info.extra.insert(property.clone(), Value::String(integrity));
      }
    }

    debug!(names = self.reconciler.index().len(), "analysed assets");
  }

  /// Fill the manifest from the compilation's assets, merge with the file on
  /// disk when configured, and emit the result into the compilation.
  ///
  /// Returns the emitted asset name, or `None` when disabled.
  pub async fn handle_process_assets_report(&mut self, compilation: &mut Compilation) -> Result<Option<String>, ManifestError> {
    if !self.options.enabled {
      return Ok(None);
    }
    let compiler = self.compiler.clone().ok_or(ManifestError::NotApplied)?;

    let hot_update = self.hot_update_files(compilation);
    self.resolved.clear();
    for asset in &compilation.assets {
      if asset.info.is_manifest() || hot_update.contains(&asset.name) {
        continue;
      }
      let names = self.reconciler.resolve_names(asset);
      for name in &names {
        self.set_for_asset(name, Value::String(asset.name.clone()), Some(asset));
      }
      self.resolved.insert(asset.name.clone(), names);
    }

    if self.options.entrypoints {
      self.write_entrypoints(&compilation.entrypoints, &hot_update);
    }

    let hash = compilation.hash.as_deref();
    let output_path = self.get_output_path()?;
    let manifest_path = PathBuf::from(interpolate(&output_path.to_string_lossy(), hash));
    let name = emitted_asset_name(&output_path, &compiler, hash);

    let value = if self.options.merge == MergeMode::Off {
      self.to_value()
    } else {
      let lock = ManifestLock::acquire(&manifest_path, &self.lock_options).await?;
      let merged = self.maybe_merge(&manifest_path).await;
      lock.release();
      merged?;
      self.to_value()
    };
    let content = serialize(value.clone(), &self.options.replacer, &self.options.space)?;

    compilation.emit_asset(
      name.clone(),
      content.clone().into_bytes(),
      AssetInfo {
        assets_manifest: Some(true),
        ..Default::default()
      },
    );
    info!(asset = %name, entries = self.len(), "emitted manifest");

    self.emitted = Some(Emitted {
      path: manifest_path,
      value,
      content,
    });
    Ok(Some(name))
  }

  /// Fold the manifest file at `path` into the table.
  ///
  /// Entries present on both sides deep-merge when both values are objects,
  /// otherwise the fresh value stays. Entries only on disk are set again.
  pub async fn maybe_merge(&mut self, path: &Path) -> Result<(), MergeError> {
    if self.options.merge == MergeMode::Off {
      return Ok(());
    }

    let existing = read_existing(path).await?;
    debug!(path = %path.display(), entries = existing.len(), "merging existing manifest");

    self.merging = true;
    for (key, old) in existing {
      match self.get(&key) {
        Some(current) if old.is_object() && current.is_object() => {
          self.set(&key, deep_merge(old, current));
        }
        Some(_) => {}
        None => {
          self.set(&key, old);
        }
      }
    }
    self.merging = false;
    Ok(())
  }

  /// Destination of the manifest emitted by the last report, placeholders
  /// substituted.
  pub fn emitted_path(&self) -> Option<&Path> {
    self.emitted.as_ref().map(|e| e.path.as_path())
  }

  /// Write the emitted manifest to disk when the write-to-disk mode asks for
  /// it. Returns whether a file was written.
  pub async fn handle_after_emit(&self) -> Result<bool, ManifestError> {
    let (Some(emitted), Some(compiler)) = (&self.emitted, &self.compiler) else {
      return Ok(false);
    };
    if !should_write_to_disk(self.options.write_to_disk, compiler, &emitted.path) {
      return Ok(false);
    }

    if self.options.merge == MergeMode::Off {
      write_manifest(&emitted.path, &emitted.content).await?;
    } else {
      let lock = ManifestLock::acquire(&emitted.path, &self.lock_options).await?;
      let written = write_manifest(&emitted.path, &emitted.content).await;
      lock.release();
      written?;
    }
    info!(path = %emitted.path.display(), "wrote manifest to disk");
    Ok(true)
  }

  /// Run the `done` taps with the emitted manifest and `stats`.
  pub async fn handle_done(&self, stats: BuildStats) -> Result<(), ManifestError> {
    let Some(emitted) = &self.emitted else {
      return Ok(());
    };
    if !self.hooks.has_done() {
      return Ok(());
    }
    let context = DoneContext {
      manifest: emitted.value.clone(),
      output_path: emitted.path.clone(),
      stats,
    };
    self.hooks.promise_done(context).await?;
    Ok(())
  }
}
