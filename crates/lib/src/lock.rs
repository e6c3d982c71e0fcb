//! File locking for the manifest read-modify-write cycle.
//!
//! Several builds writing to one manifest (multi-target builds with `merge`
//! enabled) serialize on a lock file named after the destination path. The
//! lock is an OS advisory lock on that file (`flock` on Unix, `LockFileEx` on
//! Windows), so it is released when the holder closes the file or dies.
//! Waiting callers retry until a bounded wait elapses.
//!
//! The lock file itself is never deleted. Removing it while another caller
//! has it open would let two callers lock two different files.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{LOCK_RETRY_WAIT, LOCK_WAIT};

/// Timing and placement of manifest locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
  /// Directory holding lock files. Defaults to the system temp directory.
  pub dir: PathBuf,
  /// Give up after waiting this long.
  pub wait: Duration,
  /// Sleep between attempts.
  pub retry_wait: Duration,
}

impl Default for LockOptions {
  fn default() -> Self {
    Self {
      dir: std::env::temp_dir(),
      wait: LOCK_WAIT,
      retry_wait: LOCK_RETRY_WAIT,
    }
  }
}

/// Contents of a lock file, for diagnostics.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub target: PathBuf,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error(
    "timed out after {waited:?} waiting for manifest lock held by PID {pid} (started Unix timestamp {started_at})\n\
     Lock file:\n  {lock_path}"
  )]
  Timeout {
    waited: Duration,
    pid: u32,
    started_at: u64,
    lock_path: PathBuf,
  },

  #[error(
    "timed out after {waited:?} waiting for manifest lock (could not read lock metadata)\n\
     Lock file:\n  {lock_path}"
  )]
  TimeoutUnknown { waited: Duration, lock_path: PathBuf },

  #[error("failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// A held manifest lock. Released by [`ManifestLock::release`] or on drop.
#[derive(Debug)]
pub struct ManifestLock {
  file: File,
  lock_path: PathBuf,
}

impl ManifestLock {
  /// Lock file used for `target`: the path with every run of non-word
  /// characters replaced by `-`, inside `dir`.
  pub fn lock_path_for(dir: &Path, target: &Path) -> PathBuf {
    let mut name = String::new();
    let mut in_run = false;
    for c in target.to_string_lossy().chars() {
      if c.is_alphanumeric() || c == '_' {
        name.push(c);
        in_run = false;
      } else if !in_run {
        name.push('-');
        in_run = true;
      }
    }
    dir.join(format!("{}.lock", name))
  }

  /// Acquire the lock for `target`, waiting up to `options.wait`.
  pub async fn acquire(target: &Path, options: &LockOptions) -> Result<Self, LockError> {
    let lock_path = Self::lock_path_for(&options.dir, target);
    tokio::fs::create_dir_all(&options.dir)
      .await
      .map_err(LockError::CreateDir)?;

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(LockError::OpenFile)?;

    let started = Instant::now();
    loop {
      match try_lock_exclusive(&file) {
        Ok(()) => break,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
          let waited = started.elapsed();
          if waited >= options.wait {
            return Err(Self::timeout_error(&lock_path, waited));
          }
          tokio::time::sleep(options.retry_wait).await;
        }
        Err(e) => return Err(LockError::LockFailed(e)),
      }
    }

    // From here on the guard owns the file: any early return closes it and
    // the OS drops the lock.
    let lock = Self { file, lock_path };
    lock.write_metadata(target)?;
    debug!(lock = %lock.lock_path.display(), "acquired manifest lock");
    Ok(lock)
  }

  fn write_metadata(&self, target: &Path) -> Result<(), LockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      target: target.to_path_buf(),
    };

    self.file.set_len(0).map_err(LockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(&self.file);
    writer.seek(SeekFrom::Start(0)).map_err(LockError::WriteMetadata)?;
    serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(LockError::WriteMetadata)?;
    Ok(())
  }

  fn timeout_error(lock_path: &Path, waited: Duration) -> LockError {
    if let Ok(contents) = std::fs::read_to_string(lock_path)
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
    {
      return LockError::Timeout {
        waited,
        pid: metadata.pid,
        started_at: metadata.started_at_unix,
        lock_path: lock_path.to_path_buf(),
      };
    }

    LockError::TimeoutUnknown {
      waited,
      lock_path: lock_path.to_path_buf(),
    }
  }

  /// Reads the metadata through the held handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  /// Release the lock by closing the file.
  pub fn release(self) {
    debug!(lock = %self.lock_path.display(), "released manifest lock");
  }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is valid zero-initialized and the handle is open for
  // the duration of the call.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result != 0 {
    return Ok(());
  }
  let err = io::Error::last_os_error();
  if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
    Err(io::Error::from(io::ErrorKind::WouldBlock))
  } else {
    Err(err)
  }
}
