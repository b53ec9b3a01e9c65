//! Crash-safe I/O operations
//!
//! Marker files, atomic writes with locking, and directory removal that
//! tolerates transient failures (virus scanners and indexers holding handles
//! on Windows).

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Retry policy for filesystem operations that may fail transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Give up once this much time has been spent retrying.
    pub max_elapsed: Duration,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            max_elapsed: Duration::from_secs(2),
        }
    }
}

impl RobustnessConfig {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            initial_interval: Duration::ZERO,
            max_elapsed: Duration::ZERO,
        }
    }

    fn retry<T>(&self, mut op: impl FnMut() -> std::io::Result<T>) -> std::io::Result<T> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build();
        backoff::retry(policy, || op().map_err(backoff::Error::transient)).map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
pub fn write_atomic(path: &Path, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;
    drop(temp_file);

    robustness
        .retry(|| fs::rename(&temp_path, path))
        .map_err(|e| Error::io(path, e))
}

/// Write text content to a file atomically using the default retry policy.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Read text content, mapping a missing file to `None`.
pub fn read_text_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Create an empty marker file, creating parent directories as needed.
pub fn create_marker(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|e| Error::io(path, e))
}

/// Remove a file. A file that is already gone is not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Remove a marker file created by [`create_marker`].
pub fn remove_marker(path: &Path) -> Result<()> {
    remove_file_if_exists(path)
}

/// Recursively remove a directory, retrying transient failures.
///
/// A directory that does not exist is treated as already removed.
pub fn remove_dir_all(path: &Path, robustness: RobustnessConfig) -> Result<()> {
    robustness
        .retry(|| match fs::remove_dir_all(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        })
        .map_err(|e| Error::io(path, e))
}

/// Recursively copy `src` into `dest`, creating `dest` if needed.
pub fn copy_dir_all(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    for entry in fs::read_dir(src).map_err(|e| Error::io(src, e))? {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
        }
    }
    Ok(())
}

/// Mark a file as executable by its owner (`0o744`). No-op on Windows.
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o744))
            .map_err(|e| Error::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Deletes the wrapped file when dropped, whether or not the work between
/// creation and drop succeeded.
#[derive(Debug)]
pub struct RemoveOnDrop {
    path: PathBuf,
}

impl RemoveOnDrop {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}
