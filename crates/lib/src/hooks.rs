//! Typed extension points.
//!
//! Each hook is an ordered list of named taps. Waterfall hooks fold over their
//! taps: a tap sees the accumulated value and returns `Some(new)` to replace it
//! or `None` to pass it through unchanged.
//!
//! | hook            | kind              | fires                               |
//! |-----------------|-------------------|-------------------------------------|
//! | `options`       | sync waterfall    | once, before validation             |
//! | `after_options` | sync              | once, after validation              |
//! | `apply`         | sync              | once, when setup completes          |
//! | `customize`     | sync waterfall    | once per `set()`                    |
//! | `transform`     | sync waterfall    | once per serialization              |
//! | `done`          | async series      | once per build, after emit          |

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::host::{Asset, BuildStats};
use crate::manifest::AssetsManifest;
use crate::options::ManifestOptions;

/// A boxed future that need not be `Send`; the pipeline runs on one thread.
pub type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

pub type OptionsFn = Rc<dyn Fn(&ManifestOptions) -> Option<ManifestOptions>>;
pub type AfterOptionsFn = Rc<dyn Fn(&ManifestOptions, &AssetsManifest)>;
pub type ApplyFn = Rc<dyn Fn(&AssetsManifest)>;
pub type CustomizeFn = Rc<dyn Fn(&Customized, &Entry, &AssetsManifest, Option<&Asset>) -> Option<Customized>>;
pub type TransformFn = Rc<dyn Fn(&Value, &AssetsManifest) -> Option<Value>>;
pub type DoneFn = Rc<dyn Fn(DoneContext) -> LocalBoxFuture<Result<(), HookError>>>;

/// Error reported by an asynchronous `done` tap.
#[derive(Debug, Error)]
#[error("{tap} failed: {message}")]
pub struct HookError {
  pub tap: String,
  pub message: String,
}

impl HookError {
  pub fn new(tap: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      tap: tap.into(),
      message: message.into(),
    }
  }
}

/// A manifest key and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
  pub key: String,
  pub value: Value,
}

/// Value threaded through the `customize` waterfall.
#[derive(Debug, Clone, PartialEq)]
pub enum Customized {
  /// Drop the entry entirely.
  Skip,
  /// Store the entry; missing fields default to the computed key and value.
  Entry { key: Option<String>, value: Option<Value> },
  /// Anything else. Reported once and treated as no customization.
  Other(Value),
}

impl Customized {
  /// The initial waterfall value for a computed entry.
  pub fn from_entry(key: impl Into<String>, value: Value) -> Self {
    Customized::Entry {
      key: Some(key.into()),
      value: Some(value),
    }
  }
}

/// Owned snapshot handed to `done` taps.
#[derive(Debug, Clone)]
pub struct DoneContext {
  /// The manifest as serialized, after `transform`.
  pub manifest: Value,
  /// Where the manifest lives on disk (or would, for in-memory builds).
  pub output_path: PathBuf,
  pub stats: BuildStats,
}

struct Tap<F> {
  name: String,
  f: F,
}

/// Registered taps for every extension point.
#[derive(Default)]
pub struct Hooks {
  options: Vec<Tap<OptionsFn>>,
  after_options: Vec<Tap<AfterOptionsFn>>,
  apply: Vec<Tap<ApplyFn>>,
  customize: Vec<Tap<CustomizeFn>>,
  transform: Vec<Tap<TransformFn>>,
  done: Vec<Tap<DoneFn>>,
}

impl std::fmt::Debug for Hooks {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    fn names<F>(taps: &[Tap<F>]) -> Vec<&str> {
      taps.iter().map(|t| t.name.as_str()).collect()
    }
    f.debug_struct("Hooks")
      .field("options", &names(&self.options))
      .field("after_options", &names(&self.after_options))
      .field("apply", &names(&self.apply))
      .field("customize", &names(&self.customize))
      .field("transform", &names(&self.transform))
      .field("done", &names(&self.done))
      .finish()
  }
}

impl Hooks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn tap_options(&mut self, name: impl Into<String>, f: impl Fn(&ManifestOptions) -> Option<ManifestOptions> + 'static) {
    self.options.push(Tap {
      name: name.into(),
      f: Rc::new(f),
    });
  }

  pub fn tap_after_options(&mut self, name: impl Into<String>, f: impl Fn(&ManifestOptions, &AssetsManifest) + 'static) {
    self.after_options.push(Tap {
      name: name.into(),
      f: Rc::new(f),
    });
  }

  pub fn tap_apply(&mut self, name: impl Into<String>, f: ApplyFn) {
    self.apply.push(Tap { name: name.into(), f });
  }

  pub fn tap_customize(&mut self, name: impl Into<String>, f: CustomizeFn) {
    self.customize.push(Tap { name: name.into(), f });
  }

  pub fn tap_transform(&mut self, name: impl Into<String>, f: TransformFn) {
    self.transform.push(Tap { name: name.into(), f });
  }

  pub fn tap_done(&mut self, name: impl Into<String>, f: DoneFn) {
    self.done.push(Tap { name: name.into(), f });
  }

  pub(crate) fn call_options(&self, options: ManifestOptions) -> ManifestOptions {
    self.options.iter().fold(options, |current, tap| {
      trace!(tap = %tap.name, "options");
      (tap.f)(&current).unwrap_or(current)
    })
  }

  pub(crate) fn call_after_options(&self, options: &ManifestOptions, manifest: &AssetsManifest) {
    for tap in &self.after_options {
      trace!(tap = %tap.name, "after_options");
      (tap.f)(options, manifest);
    }
  }

  pub(crate) fn call_apply(&self, manifest: &AssetsManifest) {
    for tap in &self.apply {
      trace!(tap = %tap.name, "apply");
      (tap.f)(manifest);
    }
  }

  pub(crate) fn call_customize(
    &self,
    entry: Customized,
    original: &Entry,
    manifest: &AssetsManifest,
    asset: Option<&Asset>,
  ) -> Customized {
    self.customize.iter().fold(entry, |current, tap| {
      trace!(tap = %tap.name, "customize");
      (tap.f)(&current, original, manifest, asset).unwrap_or(current)
    })
  }

  pub(crate) fn call_transform(&self, assets: Value, manifest: &AssetsManifest) -> Value {
    self.transform.iter().fold(assets, |current, tap| {
      trace!(tap = %tap.name, "transform");
      (tap.f)(&current, manifest).unwrap_or(current)
    })
  }

  /// Run `done` taps one after another, stopping at the first failure.
  pub(crate) async fn promise_done(&self, context: DoneContext) -> Result<(), HookError> {
    for tap in &self.done {
      trace!(tap = %tap.name, "done");
      (tap.f)(context.clone()).await?;
    }
    Ok(())
  }

  pub fn has_done(&self) -> bool {
    !self.done.is_empty()
  }
}
