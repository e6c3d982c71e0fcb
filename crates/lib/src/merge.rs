//! Folding an existing manifest file into fresh entries.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MergeError {
  #[error("failed to read existing manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse existing manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("existing manifest {path} is not a JSON object")]
  NotAnObject { path: PathBuf },
}

/// Read and parse the manifest at `path`.
///
/// A missing, unreadable or unparsable file is an error: merging is never
/// silently skipped.
pub async fn read_existing(path: &Path) -> Result<Map<String, Value>, MergeError> {
  let content = fs::read_to_string(path).await.map_err(|source| MergeError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  match serde_json::from_str(&content) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Err(MergeError::NotAnObject { path: path.to_path_buf() }),
    Err(source) => Err(MergeError::Parse {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Deep-merge `new` over `old`.
///
/// Objects merge key by key, keeping `old`'s key order and appending keys only
/// `new` has. Everything else, arrays included, is taken from `new` whole.
pub fn deep_merge(old: Value, new: Value) -> Value {
  match (old, new) {
    (Value::Object(mut target), Value::Object(source)) => {
      for (key, value) in source {
        match target.get_mut(&key) {
          Some(existing) => {
            let previous = existing.take();
            *existing = deep_merge(previous, value);
          }
          None => {
            target.insert(key, value);
          }
        }
      }
      Value::Object(target)
    }
    (_, new) => new,
  }
}
