//! The manifest options record.
//!
//! Options deserialize from camelCase JSON. Unknown keys are rejected and
//! omitted keys take their defaults. Callback-valued options (comparators,
//! replacer and public path functions, hook callbacks) are set in code.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::consts::{
  DEFAULT_ENTRYPOINTS_KEY, DEFAULT_FILE_EXT_REGEX, DEFAULT_INTEGRITY_HASHES, DEFAULT_INTEGRITY_PROPERTY, DEFAULT_OUTPUT,
  DEFAULT_SPACE,
};
use crate::hooks::{ApplyFn, CustomizeFn, DoneFn, TransformFn};
use crate::manifest::AssetsManifest;

/// Backing table of a manifest. Several manifests may share one table.
pub type SharedAssets = Rc<RefCell<IndexMap<String, Value>>>;

/// Sort comparator over manifest keys. Receives the manifest so it can use
/// helpers such as [`AssetsManifest::get_extension`].
pub type Comparator = Rc<dyn Fn(&AssetsManifest, &str, &str) -> Ordering>;

/// Rewrites a file name into a public URL.
pub type PublicPathFn = Rc<dyn Fn(&str, &AssetsManifest) -> String>;

/// `JSON.stringify`-style replacer: `None` omits the property.
pub type ReplacerFn = Rc<dyn Fn(&str, &Value) -> Option<Value>>;

/// Whether the manifest is written to disk after emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteToDisk {
  Off,
  On,
  /// Write only when the dev server will not and the path is outside the
  /// build output directory.
  #[default]
  Auto,
}

/// How entries are ordered before serialization.
#[derive(Clone, Default)]
pub enum SortManifest {
  Off,
  #[default]
  Lexical,
  Custom(Comparator),
}

/// How an existing manifest on disk is folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
  #[default]
  Off,
  /// Merge, inserting old entries without running `customize`.
  On,
  /// Merge, running `customize` over old entries as well.
  Customize,
}

/// Public path rewriting of string values.
#[derive(Clone, Default)]
pub enum PublicPath {
  #[default]
  None,
  /// Prefix, or base URL when it parses as an absolute URL.
  Prefix(String),
  /// Use the compiler's `output.publicPath`. Resolved at apply time.
  Compiler,
  Function(PublicPathFn),
}

/// Where the entry points block goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrypointsKey {
  Key(String),
  /// Each entry point is written as a top-level key.
  Flatten,
}

impl Default for EntrypointsKey {
  fn default() -> Self {
    EntrypointsKey::Key(DEFAULT_ENTRYPOINTS_KEY.to_string())
  }
}

/// JSON indentation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Space {
  Width(usize),
  Text(String),
}

impl Default for Space {
  fn default() -> Self {
    Space::Width(DEFAULT_SPACE)
  }
}

impl Space {
  /// The indent string, or `None` for compact output.
  pub fn indent(&self) -> Option<String> {
    match self {
      Space::Width(0) => None,
      Space::Width(n) => Some(" ".repeat(*n)),
      Space::Text(s) if s.is_empty() => None,
      Space::Text(s) => Some(s.clone()),
    }
  }
}

#[derive(Clone, Default)]
pub enum Replacer {
  #[default]
  None,
  /// Only these property names survive (array index keys are unaffected).
  Keys(Vec<String>),
  Function(ReplacerFn),
}

/// Extension detection for asset names.
#[derive(Debug, Clone)]
pub enum FileExtRegex {
  Pattern(Regex),
  /// Fall back to a plain rightmost-dot split.
  Disabled,
}

impl Default for FileExtRegex {
  fn default() -> Self {
    Regex::new(DEFAULT_FILE_EXT_REGEX)
      .map(FileExtRegex::Pattern)
      .unwrap_or(FileExtRegex::Disabled)
  }
}

impl FileExtRegex {
  pub fn regex(&self) -> Option<&Regex> {
    match self {
      FileExtRegex::Pattern(re) => Some(re),
      FileExtRegex::Disabled => None,
    }
  }
}

/// All manifest options.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ManifestOptions {
  pub enabled: bool,
  /// Pre-seeded entries. Also the handle through which several manifests share one table.
  #[serde(deserialize_with = "de::shared_assets")]
  pub assets: SharedAssets,
  pub output: PathBuf,
  #[serde(deserialize_with = "de::replacer")]
  pub replacer: Replacer,
  pub space: Space,
  #[serde(deserialize_with = "de::write_to_disk")]
  pub write_to_disk: WriteToDisk,
  #[serde(deserialize_with = "de::file_ext_regex")]
  pub file_ext_regex: FileExtRegex,
  #[serde(deserialize_with = "de::sort_manifest")]
  pub sort_manifest: SortManifest,
  #[serde(deserialize_with = "de::merge")]
  pub merge: MergeMode,
  #[serde(deserialize_with = "de::public_path")]
  pub public_path: PublicPath,
  pub context_relative_keys: bool,
  pub integrity: bool,
  pub integrity_hashes: Vec<String>,
  pub integrity_property_name: String,
  pub entrypoints: bool,
  #[serde(deserialize_with = "de::entrypoints_key")]
  pub entrypoints_key: EntrypointsKey,
  pub entrypoints_use_assets: bool,
  /// Free-form user data, carried untouched.
  pub extra: Map<String, Value>,

  #[serde(skip)]
  pub apply: Option<ApplyFn>,
  #[serde(skip)]
  pub customize: Option<CustomizeFn>,
  #[serde(skip)]
  pub transform: Option<TransformFn>,
  #[serde(skip)]
  pub done: Option<DoneFn>,
}

impl Default for ManifestOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      assets: SharedAssets::default(),
      output: PathBuf::from(DEFAULT_OUTPUT),
      replacer: Replacer::None,
      space: Space::default(),
      write_to_disk: WriteToDisk::Auto,
      file_ext_regex: FileExtRegex::default(),
      sort_manifest: SortManifest::Lexical,
      merge: MergeMode::Off,
      public_path: PublicPath::None,
      context_relative_keys: false,
      integrity: false,
      integrity_hashes: DEFAULT_INTEGRITY_HASHES.iter().map(|s| s.to_string()).collect(),
      integrity_property_name: DEFAULT_INTEGRITY_PROPERTY.to_string(),
      entrypoints: false,
      entrypoints_key: EntrypointsKey::default(),
      entrypoints_use_assets: false,
      extra: Map::new(),
      apply: None,
      customize: None,
      transform: None,
      done: None,
    }
  }
}

impl ManifestOptions {
  /// Effective configuration as JSON. Callbacks render as `"[function]"`.
  pub fn summary(&self) -> Value {
    const FUNCTION: &str = "[function]";
    let write_to_disk = match self.write_to_disk {
      WriteToDisk::Off => Value::Bool(false),
      WriteToDisk::On => Value::Bool(true),
      WriteToDisk::Auto => Value::from("auto"),
    };
    let sort_manifest = match self.sort_manifest {
      SortManifest::Off => Value::Bool(false),
      SortManifest::Lexical => Value::Bool(true),
      SortManifest::Custom(_) => Value::from(FUNCTION),
    };
    let merge = match self.merge {
      MergeMode::Off => Value::Bool(false),
      MergeMode::On => Value::Bool(true),
      MergeMode::Customize => Value::from("customize"),
    };
    let public_path = match &self.public_path {
      PublicPath::None => Value::Null,
      PublicPath::Prefix(p) => Value::from(p.as_str()),
      PublicPath::Compiler => Value::Bool(true),
      PublicPath::Function(_) => Value::from(FUNCTION),
    };
    let replacer = match &self.replacer {
      Replacer::None => Value::Null,
      Replacer::Keys(keys) => Value::from(keys.clone()),
      Replacer::Function(_) => Value::from(FUNCTION),
    };
    let space = match &self.space {
      Space::Width(n) => Value::from(*n),
      Space::Text(s) => Value::from(s.as_str()),
    };
    let file_ext_regex = match &self.file_ext_regex {
      FileExtRegex::Pattern(re) => Value::from(re.as_str()),
      FileExtRegex::Disabled => Value::Bool(false),
    };
    let entrypoints_key = match &self.entrypoints_key {
      EntrypointsKey::Key(k) => Value::from(k.as_str()),
      EntrypointsKey::Flatten => Value::Bool(false),
    };

    serde_json::json!({
      "enabled": self.enabled,
      "assets": self.assets.borrow().len(),
      "output": self.output.to_string_lossy(),
      "replacer": replacer,
      "space": space,
      "writeToDisk": write_to_disk,
      "fileExtRegex": file_ext_regex,
      "sortManifest": sort_manifest,
      "merge": merge,
      "publicPath": public_path,
      "contextRelativeKeys": self.context_relative_keys,
      "integrity": self.integrity,
      "integrityHashes": self.integrity_hashes,
      "integrityPropertyName": self.integrity_property_name,
      "entrypoints": self.entrypoints,
      "entrypointsKey": entrypoints_key,
      "entrypointsUseAssets": self.entrypoints_use_assets,
      "extra": self.extra,
    })
  }
}

impl fmt::Debug for ManifestOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ManifestOptions")
      .field("summary", &self.summary())
      .finish_non_exhaustive()
  }
}

impl fmt::Debug for SortManifest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SortManifest::Off => f.write_str("Off"),
      SortManifest::Lexical => f.write_str("Lexical"),
      SortManifest::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}

impl fmt::Debug for PublicPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublicPath::None => f.write_str("None"),
      PublicPath::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
      PublicPath::Compiler => f.write_str("Compiler"),
      PublicPath::Function(_) => f.write_str("Function(..)"),
    }
  }
}

impl fmt::Debug for Replacer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Replacer::None => f.write_str("None"),
      Replacer::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
      Replacer::Function(_) => f.write_str("Function(..)"),
    }
  }
}

/// Deserializers for the options whose JSON shape is a union.
mod de {
  use serde::de::{Deserializer, Error};

  use super::*;

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum BoolOr<T> {
    Bool(bool),
    Other(T),
  }

  pub fn shared_assets<'de, D: Deserializer<'de>>(d: D) -> Result<SharedAssets, D::Error> {
    let map = Option::<IndexMap<String, Value>>::deserialize(d)?.unwrap_or_default();
    Ok(Rc::new(RefCell::new(map)))
  }

  pub fn write_to_disk<'de, D: Deserializer<'de>>(d: D) -> Result<WriteToDisk, D::Error> {
    match BoolOr::<String>::deserialize(d)? {
      BoolOr::Bool(true) => Ok(WriteToDisk::On),
      BoolOr::Bool(false) => Ok(WriteToDisk::Off),
      BoolOr::Other(s) if s == "auto" => Ok(WriteToDisk::Auto),
      BoolOr::Other(s) => Err(D::Error::custom(format!(
        "writeToDisk must be true, false or \"auto\", got \"{}\"",
        s
      ))),
    }
  }

  pub fn merge<'de, D: Deserializer<'de>>(d: D) -> Result<MergeMode, D::Error> {
    match BoolOr::<String>::deserialize(d)? {
      BoolOr::Bool(true) => Ok(MergeMode::On),
      BoolOr::Bool(false) => Ok(MergeMode::Off),
      BoolOr::Other(s) if s == "customize" => Ok(MergeMode::Customize),
      BoolOr::Other(s) => Err(D::Error::custom(format!(
        "merge must be true, false or \"customize\", got \"{}\"",
        s
      ))),
    }
  }

  pub fn sort_manifest<'de, D: Deserializer<'de>>(d: D) -> Result<SortManifest, D::Error> {
    Ok(if bool::deserialize(d)? {
      SortManifest::Lexical
    } else {
      SortManifest::Off
    })
  }

  pub fn public_path<'de, D: Deserializer<'de>>(d: D) -> Result<PublicPath, D::Error> {
    Ok(match Option::<BoolOr<String>>::deserialize(d)? {
      None | Some(BoolOr::Bool(false)) => PublicPath::None,
      Some(BoolOr::Bool(true)) => PublicPath::Compiler,
      Some(BoolOr::Other(prefix)) => PublicPath::Prefix(prefix),
    })
  }

  pub fn replacer<'de, D: Deserializer<'de>>(d: D) -> Result<Replacer, D::Error> {
    Ok(match Option::<Vec<String>>::deserialize(d)? {
      None => Replacer::None,
      Some(keys) => Replacer::Keys(keys),
    })
  }

  pub fn file_ext_regex<'de, D: Deserializer<'de>>(d: D) -> Result<FileExtRegex, D::Error> {
    match Option::<BoolOr<String>>::deserialize(d)? {
      None | Some(BoolOr::Bool(false)) => Ok(FileExtRegex::Disabled),
      Some(BoolOr::Bool(true)) => Ok(FileExtRegex::default()),
      Some(BoolOr::Other(pattern)) => Regex::new(&pattern)
        .map(FileExtRegex::Pattern)
        .map_err(|e| D::Error::custom(format!("fileExtRegex is not a valid regex: {}", e))),
    }
  }

  pub fn entrypoints_key<'de, D: Deserializer<'de>>(d: D) -> Result<EntrypointsKey, D::Error> {
    match BoolOr::<String>::deserialize(d)? {
      BoolOr::Bool(false) => Ok(EntrypointsKey::Flatten),
      BoolOr::Bool(true) => Err(D::Error::custom("entrypointsKey must be a string or false")),
      BoolOr::Other(key) => Ok(EntrypointsKey::Key(key)),
    }
  }
}
