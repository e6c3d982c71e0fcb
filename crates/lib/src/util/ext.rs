//! Key and extension helpers.

use std::hash::Hash;

use indexmap::IndexMap;
use regex::Regex;

use super::path::basename;

/// Strip a query string or fragment from an asset name.
pub fn strip_query(name: &str) -> &str {
  match name.find(['?', '#']) {
    Some(idx) => &name[..idx],
    None => name,
  }
}

/// Extension of `name` including the leading dot.
///
/// With a regex the first match wins; without a match, or with no regex at
/// all, the extension is everything from the last dot of the basename. A
/// leading dot (`.env`) does not count as an extension.
pub fn extension(name: &str, regex: Option<&Regex>) -> String {
  let name = strip_query(name);
  if name.is_empty() {
    return String::new();
  }

  if let Some(found) = regex.and_then(|re| re.find(name)) {
    return found.as_str().to_string();
  }

  rightmost_extension(name).to_string()
}

fn rightmost_extension(name: &str) -> &str {
  let base = basename(name);
  match base.rfind('.') {
    Some(0) | None => "",
    Some(idx) => &base[idx..],
  }
}

/// Normalize path separators in a manifest key.
pub fn fix_key(key: &str) -> String {
  key.replace('\\', "/")
}

/// Group items by a computed key, mapping each kept item.
///
/// Items whose key function returns `None` are dropped. Groups keep the order
/// in which their first member was seen.
pub fn group_by<T, K, V>(
  items: impl IntoIterator<Item = T>,
  mut key: impl FnMut(&T) -> Option<K>,
  mut map: impl FnMut(T) -> V,
) -> IndexMap<K, Vec<V>>
where
  K: Hash + Eq,
{
  let mut groups: IndexMap<K, Vec<V>> = IndexMap::new();
  for item in items {
    if let Some(k) = key(&item) {
      groups.entry(k).or_default().push(map(item));
    }
  }
  groups
}

/// Build the regex that recognizes hot-update files from the compiler's
/// filename templates. Every `[placeholder]` matches any non-empty run.
pub fn hot_update_regex<S: AsRef<str>>(templates: &[S]) -> Result<Regex, regex::Error> {
  let placeholder = Regex::new(r"\\\[[\w:]+\\\]")?;
  let alternatives: Vec<String> = templates
    .iter()
    .map(|t| {
      let escaped = regex::escape(t.as_ref());
      format!("(?:{})", placeholder.replace_all(&escaped, ".+"))
    })
    .collect();
  Regex::new(&format!("(?i)(?:{})$", alternatives.join("|")))
}
