//! The entry points block.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use super::AssetsManifest;
use crate::host::Entrypoint;
use crate::options::EntrypointsKey;
use crate::util::ext::group_by;

impl AssetsManifest {
  /// Store each entry point's files grouped by extension.
  pub(crate) fn write_entrypoints(&mut self, entrypoints: &IndexMap<String, Entrypoint>, hot_update: &HashSet<String>) {
    let mut block = Map::new();
    for (name, entrypoint) in entrypoints {
      let mut groups = self.group_files(&entrypoint.files, hot_update);
      for (child, files) in &entrypoint.child_assets {
        let grouped = self.group_files(files, hot_update);
        if !grouped.is_empty() {
          groups.insert(child.clone(), Value::Object(grouped));
        }
      }
      block.insert(name.clone(), Value::Object(groups));
    }
    debug!(entrypoints = block.len(), "writing entry points");

    match self.options.entrypoints_key.clone() {
      EntrypointsKey::Flatten => {
        for (name, groups) in block {
          self.set_raw(name, groups);
        }
      }
      EntrypointsKey::Key(key) => {
        let merged = match self.get(&key) {
          Some(Value::Object(mut existing)) => {
            existing.extend(block);
            existing
          }
          _ => block,
        };
        self.set_raw(key, Value::Object(merged));
      }
    }
  }

  /// `{ "js": [...], "css": [...] }` for `files`, skipping hot updates and
  /// files without an extension.
  fn group_files(&self, files: &[String], hot_update: &HashSet<String>) -> Map<String, Value> {
    let groups = group_by(
      files.iter().filter(|f| !hot_update.contains(*f) && !self.is_hmr(f)),
      |file| {
        let ext = self.get_extension(file).trim_start_matches('.').to_lowercase();
        (!ext.is_empty()).then_some(ext)
      },
      |file| self.entrypoint_value(file),
    );
    groups.into_iter().map(|(ext, values)| (ext, Value::Array(values))).collect()
  }

  fn entrypoint_value(&self, file: &str) -> Value {
    if self.options.entrypoints_use_assets
      && let Some(stored) = self
        .resolved
        .get(file)
        .and_then(|names| names.first())
        .and_then(|name| self.get(name))
    {
      return stored;
    }
    Value::String(self.get_public_path(file))
  }
}
