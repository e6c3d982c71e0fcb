//! The bundler's side of the contract.
//!
//! The manifest never drives a build; it observes one. These types carry what
//! the host compiler hands over at each lifecycle point: compiler settings,
//! the assets of a compilation with their producer-attached info, chunk to
//! file lists, asset-module build metadata and entry points.
//!
//! All of them deserialize from JSON so a finished build can be recorded and
//! replayed (see [`BuildRecord`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::DEFAULT_HOT_UPDATE_TEMPLATES;

/// Producer-attached metadata of an emitted asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
  /// Set on hot-update files, which never belong in a manifest.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hot_module_replacement: Option<bool>,

  /// Source file the asset was produced from, relative to the context.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_filename: Option<String>,

  /// Set on manifests emitted by this crate.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assets_manifest: Option<bool>,

  /// Everything else, e.g. integrity digests from other producers.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl AssetInfo {
  pub fn is_hot_update(&self) -> bool {
    self.hot_module_replacement == Some(true)
  }

  pub fn is_manifest(&self) -> bool {
    self.assets_manifest == Some(true)
  }
}

/// An output asset of a compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
  /// Final (hashed) file name relative to the output directory.
  pub name: String,
  /// Content. Not part of recorded builds; loaded from disk when needed.
  #[serde(skip)]
  pub source: Vec<u8>,
  #[serde(default)]
  pub info: AssetInfo,
}

impl Asset {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_source(mut self, source: impl Into<Vec<u8>>) -> Self {
    self.source = source.into();
    self
  }

  pub fn with_info(mut self, info: AssetInfo) -> Self {
    self.info = info;
    self
  }
}

/// Build metadata of a module handled by the host's asset-module mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetModule {
  /// Name of the asset the module was written to.
  pub filename: String,
  /// Request path of the module as the user wrote it, resolved.
  pub user_request: PathBuf,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_filename: Option<String>,
}

/// A file emitted by a loader while processing a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderEmission {
  pub output_name: String,
  pub user_request: PathBuf,
}

/// Files of one entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrypoint {
  /// Files in load order.
  pub files: Vec<String>,
  /// Extra grouped lists, e.g. `preload` and `prefetch`.
  #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
  pub child_assets: IndexMap<String, Vec<String>>,
}

/// The dev server's own write-to-disk setting.
#[derive(Clone)]
pub enum DevServerWriteToDisk {
  Flag(bool),
  /// Decides per candidate path.
  Predicate(Rc<dyn Fn(&Path) -> bool>),
}

impl Default for DevServerWriteToDisk {
  fn default() -> Self {
    DevServerWriteToDisk::Flag(false)
  }
}

impl fmt::Debug for DevServerWriteToDisk {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DevServerWriteToDisk::Flag(b) => f.debug_tuple("Flag").field(b).finish(),
      DevServerWriteToDisk::Predicate(_) => f.write_str("Predicate(..)"),
    }
  }
}

impl<'de> Deserialize<'de> for DevServerWriteToDisk {
  fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    bool::deserialize(d).map(DevServerWriteToDisk::Flag)
  }
}

impl DevServerWriteToDisk {
  /// Whether the dev server persists `path` itself.
  pub fn writes(&self, path: &Path) -> bool {
    match self {
      DevServerWriteToDisk::Flag(b) => *b,
      DevServerWriteToDisk::Predicate(f) => f(path),
    }
  }
}

/// Dev server settings visible to the compiler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServer {
  #[serde(default)]
  pub output_path: Option<PathBuf>,
  #[serde(default)]
  pub write_to_disk: DevServerWriteToDisk,
}

fn default_hot_update_templates() -> Vec<String> {
  DEFAULT_HOT_UPDATE_TEMPLATES.iter().map(|s| s.to_string()).collect()
}

fn process_args() -> Vec<String> {
  std::env::args().collect()
}

/// Compiler-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compiler {
  /// Root directory that context-relative keys are relative to.
  pub context: PathBuf,
  /// Build output directory.
  pub output_path: PathBuf,
  #[serde(default)]
  pub public_path: Option<String>,
  #[serde(default = "default_hot_update_templates")]
  pub hot_update_templates: Vec<String>,
  #[serde(default)]
  pub dev_server: Option<DevServer>,
  /// The output filesystem is not the on-disk one (in-memory dev builds).
  #[serde(default)]
  pub transient_output_fs: bool,
  /// Process arguments, inspected for a serve-mode invocation.
  #[serde(skip, default = "process_args")]
  pub argv: Vec<String>,
}

impl Compiler {
  pub fn new(context: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
    Self {
      context: context.into(),
      output_path: output_path.into(),
      public_path: None,
      hot_update_templates: default_hot_update_templates(),
      dev_server: None,
      transient_output_fs: false,
      argv: process_args(),
    }
  }
}

/// Summary handed to `done` taps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
  pub hash: Option<String>,
  pub assets: Vec<String>,
  pub entrypoints: Vec<String>,
  pub warnings: Vec<String>,
}

/// One compilation's results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
  #[serde(default)]
  pub hash: Option<String>,
  #[serde(default)]
  pub assets: Vec<Asset>,
  #[serde(default)]
  pub assets_by_chunk_name: IndexMap<String, Vec<String>>,
  #[serde(default)]
  pub asset_modules: Vec<AssetModule>,
  #[serde(default)]
  pub entrypoints: IndexMap<String, Entrypoint>,
  #[serde(default)]
  pub warnings: Vec<String>,
}

impl Compilation {
  pub fn asset(&self, name: &str) -> Option<&Asset> {
    self.assets.iter().find(|a| a.name == name)
  }

  /// Add an asset, replacing any asset with the same name.
  pub fn emit_asset(&mut self, name: impl Into<String>, source: impl Into<Vec<u8>>, info: AssetInfo) {
    let asset = Asset {
      name: name.into(),
      source: source.into(),
      info,
    };
    match self.assets.iter_mut().find(|a| a.name == asset.name) {
      Some(existing) => *existing = asset,
      None => self.assets.push(asset),
    }
  }

  pub fn stats(&self) -> BuildStats {
    BuildStats {
      hash: self.hash.clone(),
      assets: self.assets.iter().map(|a| a.name.clone()).collect(),
      entrypoints: self.entrypoints.keys().cloned().collect(),
      warnings: self.warnings.clone(),
    }
  }
}

/// A finished build, recorded for replay.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
  pub compiler: Compiler,
  #[serde(default)]
  pub loader_emissions: Vec<LoaderEmission>,
  #[serde(default)]
  pub compilation: Compilation,
}
