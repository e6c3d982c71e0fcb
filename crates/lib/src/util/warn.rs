//! Process-wide warning de-duplication.
//!
//! Non-fatal conditions (unsupported digest algorithms, odd customize results,
//! dev-server path fallbacks) are reported once per process, keyed by message
//! text, no matter how many manifests or builds hit them.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

use tracing::warn;

static SEEN: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Emit `message` as a warning unless it was already emitted.
///
/// Returns `true` when the warning was emitted by this call.
pub fn warn_once(message: impl Into<String>) -> bool {
  let message = message.into();
  let mut seen = SEEN.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
  if seen.contains(&message) {
    return false;
  }
  warn!("{}", message);
  seen.insert(message);
  true
}

/// Forget every warning emitted so far.
pub fn reset_warnings() {
  SEEN.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
}
