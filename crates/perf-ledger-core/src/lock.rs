// crates/perf-ledger-core/src/lock.rs
// ============================================================================
// Module: Store Lock
// Description: Advisory cross-process lock guarding one store document.
// Purpose: Serialize load-mutate-save cycles against the same store path.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Ingestion runs for the same store may be launched close together by an
//! external scheduler. Each run holds a [`StoreLock`] on the sibling
//! `<store>.lock` file for the whole load-to-save span so two runs can never
//! both read the pre-update document. The lock is an OS advisory lock: it is
//! released when the guard drops or the process exits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs::File;
use std::fs::OpenOptions;
use std::fs::TryLockError;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::store::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix appended to the store file name for its lock file.
const LOCK_SUFFIX: &str = ".lock";
/// Delay between lock attempts while another run holds it.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// SECTION: Lock Guard
// ============================================================================

/// Exclusive advisory lock on a store document.
#[derive(Debug)]
pub struct StoreLock {
    /// Open handle carrying the OS lock.
    file: File,
    /// Path of the lock file.
    path: PathBuf,
}

impl StoreLock {
    /// Returns the lock file path for a store document.
    #[must_use]
    pub fn lock_path(store_path: &Path) -> PathBuf {
        let mut name = store_path.file_name().map(OsString::from).unwrap_or_default();
        name.push(LOCK_SUFFIX);
        store_path.with_file_name(name)
    }

    /// Acquires the lock, waiting up to `timeout` for other holders.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockTimeout`] when the lock stays held past the
    /// timeout, or [`StoreError::Io`] when the lock file cannot be opened.
    pub fn acquire(store_path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let path = Self::lock_path(store_path);
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| StoreError::Io(format!("open lock {}: {err}", path.display())))?;
        let started = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path,
                    });
                }
                Err(TryLockError::WouldBlock) => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::LockTimeout {
                            path: path.display().to_string(),
                            waited_ms: timeout.as_millis(),
                        });
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(TryLockError::Error(err)) => {
                    return Err(StoreError::Io(format!("lock {}: {err}", path.display())));
                }
            }
        }
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
