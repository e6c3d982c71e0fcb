//! Output placement and serialization.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::consts::OUTPUT_CHUNK_NAME;
use crate::host::Compiler;
use crate::options::{Replacer, Space, WriteToDisk};
use crate::util::path::{basename, is_within, relative, resolve, to_slash};
use crate::util::warn::warn_once;

#[derive(Debug, Error)]
pub enum OutputError {
  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Whether the build runs under a dev server that serves from memory.
///
/// Detected from a serve-mode invocation in the process arguments, or from
/// the host reporting an output filesystem other than the on-disk one.
pub fn in_dev_server(compiler: &Compiler) -> bool {
  let serve_invocation = compiler
    .argv
    .iter()
    .any(|arg| arg == "serve" || arg.contains("webpack-dev-server"));
  serve_invocation || compiler.transient_output_fs
}

/// Absolute path of the manifest for `output`.
pub fn resolve_output_path(output: &Path, compiler: &Compiler) -> PathBuf {
  if output.is_absolute() {
    return output.to_path_buf();
  }

  if in_dev_server(compiler) {
    let base = compiler
      .dev_server
      .as_ref()
      .and_then(|d| d.output_path.clone())
      .unwrap_or_else(|| compiler.output_path.clone());

    let base = if base.as_os_str().is_empty() || base == Path::new("/") {
      warn_once("use an absolute path in options.output when running under a dev server");
      compiler.context.clone()
    } else {
      base
    };
    return resolve(&base, output);
  }

  resolve(&compiler.output_path, output)
}

/// Substitute `[name]`, `[hash]` and `[fullhash]` in an output name.
pub fn interpolate(name: &str, hash: Option<&str>) -> String {
  let hash = hash.unwrap_or_default();
  name
    .replace("[name]", OUTPUT_CHUNK_NAME)
    .replace("[fullhash]", hash)
    .replace("[hash]", hash)
}

/// Name under which the manifest is emitted into the compilation.
///
/// Relative to the output directory, or just the file name under a dev server.
pub fn emitted_asset_name(output_path: &Path, compiler: &Compiler, hash: Option<&str>) -> String {
  let name = if in_dev_server(compiler) {
    basename(&to_slash(output_path)).to_string()
  } else {
    to_slash(&relative(&compiler.output_path, output_path))
  };
  interpolate(&name, hash)
}

/// Decide whether the manifest must be written to disk after emit.
pub fn should_write_to_disk(mode: WriteToDisk, compiler: &Compiler, manifest_path: &Path) -> bool {
  match mode {
    WriteToDisk::Off => false,
    WriteToDisk::On => true,
    WriteToDisk::Auto => {
      if let Some(dev_server) = &compiler.dev_server
        && dev_server.write_to_disk.writes(manifest_path)
      {
        debug!(path = %manifest_path.display(), "dev server writes the manifest itself");
        return false;
      }
      !is_within(&compiler.output_path, manifest_path)
    }
  }
}

/// Reorder an object's keys.
pub fn sort_object(map: &Map<String, Value>, mut compare: impl FnMut(&str, &str) -> Ordering) -> Map<String, Value> {
  let mut keys: Vec<&String> = map.keys().collect();
  keys.sort_by(|a, b| compare(a, b));
  keys.into_iter().map(|k| (k.clone(), map[k].clone())).collect()
}

fn replace(key: &str, value: Value, replacer: &Replacer) -> Option<Value> {
  let value = match replacer {
    Replacer::Function(f) => f(key, &value)?,
    _ => value,
  };

  Some(match value {
    Value::Object(map) => Value::Object(
      map
        .into_iter()
        .filter(|(k, _)| match replacer {
          Replacer::Keys(keys) => keys.contains(k),
          _ => true,
        })
        .filter_map(|(k, v)| replace(&k, v, replacer).map(|v| (k, v)))
        .collect(),
    ),
    Value::Array(items) => Value::Array(
      items
        .into_iter()
        .enumerate()
        .map(|(i, v)| replace(&i.to_string(), v, replacer).unwrap_or(Value::Null))
        .collect(),
    ),
    other => other,
  })
}

/// Render `value` the way `JSON.stringify(value, replacer, space)` would.
///
/// A replacer that drops the root yields `{}`.
pub fn serialize(value: Value, replacer: &Replacer, space: &Space) -> Result<String, OutputError> {
  let value = match replacer {
    Replacer::None => value,
    _ => match replace("", value, replacer) {
      Some(v) => v,
      None => return Ok("{}".to_string()),
    },
  };

  match space.indent() {
    None => serde_json::to_string(&value).map_err(OutputError::Serialize),
    Some(indent) => {
      let mut buf = Vec::new();
      let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
      value.serialize(&mut ser).map_err(OutputError::Serialize)?;
      Ok(String::from_utf8_lossy(&buf).into_owned())
    }
  }
}

/// Write `content` to `path`, creating parent directories.
pub async fn write_manifest(path: &Path, content: &str) -> Result<(), OutputError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).await.map_err(|source| OutputError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  fs::write(path, content).await.map_err(|source| OutputError::Write {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(path = %path.display(), "wrote manifest");
  Ok(())
}
