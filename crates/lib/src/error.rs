use thiserror::Error;

use crate::hooks::HookError;
use crate::lock::LockError;
use crate::merge::MergeError;
use crate::options::OptionsError;
use crate::output::OutputError;

/// Any failure surfaced by a manifest build.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error(transparent)]
  Options(#[from] OptionsError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error(transparent)]
  Output(#[from] OutputError),

  #[error(transparent)]
  Hook(#[from] HookError),

  #[error("manifest has not been applied to a compiler")]
  NotApplied,
}
