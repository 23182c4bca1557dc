//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Tuning for writes that may contend with other processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to keep retrying the advisory lock before giving up.
    pub lock_timeout: Duration,
    /// Flush the temp file to disk before the rename.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// Write content atomically to a file.
///
/// Takes an exclusive advisory lock on a hidden sidecar file
/// (`.<name>.lock`), writes to a hidden temp file in the same directory and
/// renames it over the target. Readers never observe a partial file. The
/// sidecar is unlocked and then removed once the rename has happened, so
/// only one writer per directory is expected at a time.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::io(&native_path, std::io::ErrorKind::InvalidInput.into()))?;

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let lock_path = native_path.with_file_name(format!(".{file_name}.lock"));
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    acquire_lock(&lock_file, config.lock_timeout).map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let temp_path =
        native_path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));
    let result = write_and_rename(&temp_path, &native_path, content, config.enable_fsync);
    if result.is_err() {
        remove_quietly(&temp_path);
    }

    // Unlock before unlinking. Removing the sidecar assumes one sync pass
    // per directory at a time; a concurrent writer that opened the old
    // sidecar could otherwise lock it alongside a writer on a fresh one.
    drop(lock_file);
    remove_quietly(&lock_path);

    result
}

fn remove_quietly(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), error = %e, "failed to clean up");
    }
}

fn acquire_lock(file: &File, timeout: Duration) -> std::result::Result<(), std::io::Error> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(10))
        .with_max_interval(Duration::from_millis(200))
        .with_max_elapsed_time(Some(timeout))
        .build();

    backoff::retry(policy, || {
        FileExt::try_lock_exclusive(file).map_err(|e| {
            tracing::debug!(error = %e, "lock busy, retrying");
            backoff::Error::transient(e)
        })
    })
    .map_err(|e| match e {
        backoff::Error::Permanent(e) | backoff::Error::Transient { err: e, .. } => e,
    })
}

fn write_and_rename(
    temp_path: &std::path::Path,
    target: &std::path::Path,
    content: &[u8],
    fsync: bool,
) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if fsync {
        temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    }
    drop(temp_file);

    fs::rename(temp_path, target).map_err(|e| Error::io(target, e))
}

/// Read a UTF-8 text file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// List the regular, non-hidden files in `dir` with the given extension,
/// sorted by path.
///
/// The extension comparison ignores ASCII case. Fails with
/// [`Error::NotADirectory`] when `dir` is missing or is not a directory.
pub fn list_files(dir: &NormalizedPath, extension: &str) -> Result<Vec<NormalizedPath>> {
    let native_dir = dir.to_native();
    if !native_dir.is_dir() {
        return Err(Error::NotADirectory { path: native_dir });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&native_dir).map_err(|e| Error::io(&native_dir, e))? {
        let entry = entry.map_err(|e| Error::io(&native_dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let path = NormalizedPath::new(entry.path());
        if path.is_hidden() {
            continue;
        }
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
