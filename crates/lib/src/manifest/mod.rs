//! The assets manifest.
//!
//! An [`AssetsManifest`] is configured once with [`ManifestOptions`], applied
//! to a [`Compiler`], and then driven through the build lifecycle by the host
//! (see the `handle_*` methods). Entries live in a table that several
//! manifests may share.

mod entrypoints;
mod lifecycle;
mod store;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::consts::PLUGIN_NAME;
use crate::error::ManifestError;
use crate::hooks::Hooks;
use crate::host::Compiler;
use crate::lock::LockOptions;
use crate::options::{ManifestOptions, PublicPath, SharedAssets, SortManifest};
use crate::output::{OutputError, in_dev_server, resolve_output_path, serialize, sort_object};
use crate::reconcile::Reconciler;
use crate::util::ext::{extension, hot_update_regex};

/// What the last report emitted.
#[derive(Debug, Clone)]
struct Emitted {
  path: PathBuf,
  value: Value,
  content: String,
}

pub struct AssetsManifest {
  options: ManifestOptions,
  hooks: Hooks,
  assets: SharedAssets,
  reconciler: Reconciler,
  compiler: Option<Compiler>,
  merging: bool,
  lock_options: LockOptions,
  /// Original names used for each reported file.
  resolved: IndexMap<String, Vec<String>>,
  emitted: Option<Emitted>,
}

impl std::fmt::Debug for AssetsManifest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AssetsManifest")
      .field("options", &self.options)
      .field("hooks", &self.hooks)
      .field("entries", &self.assets.borrow().len())
      .field("merging", &self.merging)
      .finish_non_exhaustive()
  }
}

impl Default for AssetsManifest {
  fn default() -> Self {
    Self::new(ManifestOptions::default())
  }
}

impl AssetsManifest {
  /// Create a manifest with the built-in sort tap registered on `transform`.
  ///
  /// Entries may be set right away; they are folded into `options.assets`
  /// when the manifest is applied.
  pub fn new(options: ManifestOptions) -> Self {
    let mut manifest = Self {
      options,
      hooks: Hooks::new(),
      assets: Rc::new(RefCell::new(IndexMap::new())),
      reconciler: Reconciler::default(),
      compiler: None,
      merging: false,
      lock_options: LockOptions::default(),
      resolved: IndexMap::new(),
      emitted: None,
    };
    manifest
      .hooks
      .tap_transform(PLUGIN_NAME, Rc::new(|value: &Value, manifest: &AssetsManifest| manifest.sort_value(value)));
    manifest
  }

  pub fn hooks(&self) -> &Hooks {
    &self.hooks
  }

  /// Register taps. Taps added after [`apply`](Self::apply) still fire for
  /// the per-entry and later hooks.
  pub fn hooks_mut(&mut self) -> &mut Hooks {
    &mut self.hooks
  }

  pub fn options(&self) -> &ManifestOptions {
    &self.options
  }

  pub fn compiler(&self) -> Option<&Compiler> {
    self.compiler.as_ref()
  }

  pub fn set_lock_options(&mut self, lock_options: LockOptions) {
    self.lock_options = lock_options;
  }

  /// True only while entries from an existing manifest file are folded in.
  pub fn is_merging(&self) -> bool {
    self.merging
  }

  /// The backing table, shared with any manifest applied with the same
  /// `options.assets`.
  pub fn shared_assets(&self) -> SharedAssets {
    Rc::clone(&self.assets)
  }

  pub fn get_extension(&self, name: &str) -> String {
    extension(name, self.options.file_ext_regex.regex())
  }

  /// Whether `name` matches the compiler's hot-update file names.
  pub fn is_hmr(&self, name: &str) -> bool {
    self.reconciler.is_hot_update_name(name)
  }

  pub fn in_dev_server(&self) -> bool {
    self.compiler.as_ref().is_some_and(in_dev_server)
  }

  /// Finish configuration against `compiler`.
  ///
  /// Runs the `options` waterfall, validates the result, switches to the
  /// shared table and fires `after_options` and `apply`.
  pub fn apply(&mut self, compiler: Compiler) -> Result<(), ManifestError> {
    let mut options = self.hooks.call_options(self.options.clone()).validate()?;

    if matches!(options.public_path, PublicPath::Compiler) {
      options.public_path = match compiler.public_path.as_deref() {
        Some(prefix) if !prefix.is_empty() && prefix != "auto" => PublicPath::Prefix(prefix.to_string()),
        _ => PublicPath::None,
      };
    }

    if !Rc::ptr_eq(&self.assets, &options.assets) {
      let pending = std::mem::take(&mut *self.assets.borrow_mut());
      let mut shared = options.assets.borrow_mut();
      for (key, value) in pending {
        shared.entry(key).or_insert(value);
      }
    }
    self.assets = Rc::clone(&options.assets);

    let hot_update = match hot_update_regex(&compiler.hot_update_templates) {
      Ok(re) => Some(re),
      Err(e) => {
        warn!(error = %e, "hot-update file name templates do not form a valid pattern");
        None
      }
    };
    self.reconciler = Reconciler::new(
      compiler.context.clone(),
      options.context_relative_keys,
      options.file_ext_regex.regex().cloned(),
      hot_update,
    );

    if let Some(f) = options.apply.clone() {
      self.hooks.tap_apply(format!("{}.option.apply", PLUGIN_NAME), f);
    }
    if let Some(f) = options.customize.clone() {
      self.hooks.tap_customize(format!("{}.option.customize", PLUGIN_NAME), f);
    }
    if let Some(f) = options.transform.clone() {
      self.hooks.tap_transform(format!("{}.option.transform", PLUGIN_NAME), f);
    }
    if let Some(f) = options.done.clone() {
      self.hooks.tap_done(format!("{}.option.done", PLUGIN_NAME), f);
    }

    self.options = options;
    self.compiler = Some(compiler);

    self.hooks.call_after_options(&self.options, self);
    if !self.options.enabled {
      debug!("manifest disabled");
      return Ok(());
    }
    self.hooks.call_apply(self);
    debug!(output = %self.options.output.display(), "manifest applied");
    Ok(())
  }

  /// Absolute destination of the manifest file.
  pub fn get_output_path(&self) -> Result<PathBuf, ManifestError> {
    let compiler = self.compiler.as_ref().ok_or(ManifestError::NotApplied)?;
    Ok(resolve_output_path(&self.options.output, compiler))
  }

  /// Apply `sortManifest` to an object value. `None` leaves it as is.
  pub fn sort_value(&self, value: &Value) -> Option<Value> {
    let Value::Object(map) = value else {
      return None;
    };
    match &self.options.sort_manifest {
      SortManifest::Off => None,
      SortManifest::Lexical => Some(Value::Object(sort_object(map, |a, b| a.cmp(b)))),
      SortManifest::Custom(compare) => Some(Value::Object(sort_object(map, |a, b| compare(self, a, b)))),
    }
  }

  /// The manifest as it will be written: a snapshot of the table passed
  /// through the `transform` waterfall.
  pub fn to_value(&self) -> Value {
    let snapshot = Value::Object(self.assets.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    self.hooks.call_transform(snapshot, self)
  }

  /// [`to_value`](Self::to_value) rendered with the configured replacer and
  /// indentation.
  pub fn to_json_string(&self) -> Result<String, OutputError> {
    serialize(self.to_value(), &self.options.replacer, &self.options.space)
  }
}
