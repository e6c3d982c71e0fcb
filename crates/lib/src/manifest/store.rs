//! Entry operations.

use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use super::AssetsManifest;
use crate::hooks::{Customized, Entry};
use crate::host::Asset;
use crate::options::{MergeMode, PublicPath};
use crate::util::ext::fix_key;
use crate::util::warn::warn_once;

impl AssetsManifest {
  /// Add an entry through the `customize` waterfall.
  ///
  /// The key has its separators normalized and string values go through
  /// public-path rewriting first. At most one entry is stored.
  pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
    self.set_for_asset(key, value, None)
  }

  /// [`set`](Self::set) while reporting `asset`, which `customize` taps and
  /// integrity lookup can see.
  pub(crate) fn set_for_asset(&mut self, key: &str, value: Value, asset: Option<&Asset>) -> &mut Self {
    if self.merging && self.options.merge != MergeMode::Customize {
      return self.set_raw(key, value);
    }

    let fixed = fix_key(key);
    let public = match &value {
      Value::String(s) => Value::String(self.get_public_path(s)),
      other => other.clone(),
    };
    let original = Entry {
      key: key.to_string(),
      value,
    };

    let customized = self
      .hooks
      .call_customize(Customized::from_entry(fixed.clone(), public.clone()), &original, self, asset);

    let (new_key, new_value) = match customized {
      Customized::Skip => {
        debug!(key = %fixed, "customize dropped entry");
        return self;
      }
      Customized::Entry { key, value } => (key.unwrap_or(fixed), value.unwrap_or_else(|| public.clone())),
      Customized::Other(other) => {
        trace!(value = %other, "unexpected customize result");
        warn_once("customize returned something other than an entry or false; storing the entry unchanged");
        (fixed, public.clone())
      }
    };

    let new_value = if self.options.integrity && new_value.is_string() && new_value == public {
      self.with_integrity(new_value, asset)
    } else {
      new_value
    };

    self.assets.borrow_mut().insert(new_key, new_value);
    self
  }

  fn with_integrity(&self, src: Value, asset: Option<&Asset>) -> Value {
    let property = &self.options.integrity_property_name;
    let integrity = asset
      .and_then(|a| a.info.extra.get(property))
      .and_then(Value::as_str)
      .unwrap_or_default();

    let mut wrapped = Map::new();
    wrapped.insert("src".to_string(), src);
    wrapped.insert(property.clone(), Value::from(integrity));
    Value::Object(wrapped)
  }

  /// Store an entry as given, bypassing key normalization and `customize`.
  pub fn set_raw(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
    self.assets.borrow_mut().insert(key.into(), value);
    self
  }

  /// Whether `key` is stored, literally or in normalized form.
  pub fn has(&self, key: &str) -> bool {
    let assets = self.assets.borrow();
    assets.contains_key(key) || assets.contains_key(&fix_key(key))
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    let assets = self.assets.borrow();
    assets.get(key).or_else(|| assets.get(&fix_key(key))).cloned()
  }

  pub fn get_or(&self, key: &str, default: Value) -> Value {
    self.get(key).unwrap_or(default)
  }

  /// Remove `key` in both forms. Returns whether anything was removed.
  pub fn delete(&mut self, key: &str) -> bool {
    let mut assets = self.assets.borrow_mut();
    let literal = assets.shift_remove(key).is_some();
    let fixed = assets.shift_remove(&fix_key(key)).is_some();
    literal || fixed
  }

  /// Remove every entry. The table itself is kept, so manifests sharing it
  /// see the change.
  pub fn clear(&mut self) {
    self.assets.borrow_mut().clear();
  }

  pub fn len(&self) -> usize {
    self.assets.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.borrow().is_empty()
  }

  pub fn keys(&self) -> Vec<String> {
    self.assets.borrow().keys().cloned().collect()
  }

  /// Rewrite `filename` with the configured public path.
  ///
  /// A prefix that parses as an absolute URL is joined as a base URL;
  /// anything else is prepended as is.
  pub fn get_public_path(&self, filename: &str) -> String {
    match &self.options.public_path {
      PublicPath::None | PublicPath::Compiler => filename.to_string(),
      PublicPath::Prefix(prefix) => match Url::parse(prefix).and_then(|base| base.join(filename)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", prefix, filename),
      },
      PublicPath::Function(f) => f(filename, self),
    }
  }
}
