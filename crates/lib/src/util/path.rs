//! Lexical path helpers.
//!
//! None of these touch the filesystem. They mirror the `join`, `dirname`,
//! `basename`, `normalize`, `resolve` and `relative` operations bundler
//! configuration is written against.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::ParentDir => match normalized.components().next_back() {
        Some(Component::Normal(_)) => {
          normalized.pop();
        }
        Some(Component::RootDir | Component::Prefix(_)) => {}
        _ => normalized.push(".."),
      },
      Component::CurDir => {}
      _ => normalized.push(component),
    }
  }
  normalized
}

/// Resolve `path` against `base`. Absolute paths are returned normalized.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    normalize(path)
  } else {
    normalize(&base.join(path))
  }
}

/// Relative path that leads from `from` to `to`.
///
/// Both paths are normalized first. Identical paths yield an empty path.
pub fn relative(from: &Path, to: &Path) -> PathBuf {
  let from = normalize(from);
  let to = normalize(to);
  let from_components: Vec<_> = from.components().collect();
  let to_components: Vec<_> = to.components().collect();

  let common_len = from_components
    .iter()
    .zip(to_components.iter())
    .take_while(|(a, b)| a == b)
    .count();

  let mut relative = PathBuf::new();
  for _ in common_len..from_components.len() {
    relative.push("..");
  }
  for component in &to_components[common_len..] {
    relative.push(component);
  }
  relative
}

/// Final component of a slash or backslash separated name.
pub fn basename(name: &str) -> &str {
  name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Everything before the final component, or `""` when there is none.
pub fn dirname(name: &str) -> &str {
  match name.rfind(['/', '\\']) {
    Some(idx) => &name[..idx],
    None => "",
  }
}

/// Join a directory part and a file name with a forward slash.
///
/// An empty or `.` directory yields the bare file name.
pub fn join_name(dir: &str, file: &str) -> String {
  if dir.is_empty() || dir == "." {
    file.to_string()
  } else {
    format!("{}/{}", dir.trim_end_matches(['/', '\\']), file)
  }
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}

/// Whether `path` is lexically inside `dir` (or equal to it).
pub fn is_within(dir: &Path, path: &Path) -> bool {
  let rel = relative(dir, path);
  !matches!(rel.components().next(), Some(Component::ParentDir)) && !rel.is_absolute()
}
