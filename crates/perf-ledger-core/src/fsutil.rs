// crates/perf-ledger-core/src/fsutil.rs
// ============================================================================
// Module: Filesystem Helpers
// Description: Bounded reads and atomic replace-by-rename writes.
// Purpose: Share size-limited input handling and crash-safe output handling.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Inputs are read with a hard byte limit so an oversized file fails closed
//! instead of exhausting memory. Outputs are written to a unique temporary
//! sibling, synced, and renamed over the destination, so a concurrent reader
//! observes either the previous document or the new one, never a partial
//! write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum attempts to allocate a unique temporary file name.
const TEMP_ATTEMPTS: usize = 16;
/// Process-wide counter keeping temporary names unique across threads.
static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

/// Errors raised by [`read_bytes_with_limit`].
#[derive(Debug, Error)]
pub enum ReadLimitError {
    /// Underlying I/O failure, including a missing file.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// The file is larger than the allowed limit.
    #[error("file is {size} bytes (limit {limit})")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed size in bytes.
        limit: usize,
    },
}

impl ReadLimitError {
    /// Returns true when the file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(err) if err.kind() == ErrorKind::NotFound)
    }
}

/// Reads a file, failing closed when it exceeds `max_bytes`.
///
/// # Errors
///
/// Returns [`ReadLimitError`] on I/O failure or when the file is too large.
pub fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Atomic Writes
// ============================================================================

/// Replaces `path` with `bytes` through a synced temporary sibling.
///
/// # Errors
///
/// Returns an I/O error when any step fails; the temporary file is removed
/// and the destination is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = parent_dir(path);
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
    }
    let (temp_path, mut file) = create_temp_sibling(path)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}

/// Creates a unique temporary file alongside the destination.
fn create_temp_sibling(path: &Path) -> io::Result<(PathBuf, File)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?;
    let parent = parent_dir(path);
    for _ in 0 .. TEMP_ATTEMPTS {
        let attempt = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_name = format!(".{file_name}.tmp.{}.{attempt}", std::process::id());
        let temp_path = parent.join(temp_name);
        match OpenOptions::new().write(true).create_new(true).open(&temp_path) {
            Ok(file) => return Ok((temp_path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(ErrorKind::AlreadyExists, "failed to allocate temporary output path"))
}

/// Returns the directory containing `path` (empty for bare file names).
fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}
