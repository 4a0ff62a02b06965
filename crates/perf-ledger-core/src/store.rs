// crates/perf-ledger-core/src/store.rs
// ============================================================================
// Module: History Store
// Description: File-backed, bounded history of normalized records.
// Purpose: Upsert device snapshots per (target, date) and prune old dates.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`HistoryStore`] is the in-memory view of one persisted store document. It
//! supports exactly four operations: load, upsert, prune, and save. Upserts
//! merge at the granularity of a single device key; pruning removes whole
//! entries whose date falls outside the retention window. Saves replace the
//! document atomically.
//!
//! [`HistoryFile`] wraps the four operations in a locked transaction so
//! concurrent ingestion runs against the same document never lose updates.
//!
//! ## Invariants
//! - At most one entry exists per (target, date).
//! - After pruning, at most `retention_days` distinct dates remain.
//! - Device keys are only ever removed together with their whole entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use thiserror::Error;

use crate::date::DateSortKey;
use crate::fsutil::ReadLimitError;
use crate::fsutil::read_bytes_with_limit;
use crate::fsutil::write_atomic;
use crate::lock::StoreLock;
use crate::record::HistoryDocument;
use crate::record::HistoryEntry;
use crate::record::MetricsRecord;
use crate::record::RESERVED_ENTRY_KEYS;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of distinct dates retained.
pub const DEFAULT_RETENTION_DAYS: usize = 15;
/// Maximum store document size accepted on load.
pub const MAX_STORE_BYTES: usize = 64 * 1024 * 1024;
/// Default time to wait for a competing run to release the store lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum attempts to find a free quarantine file name.
const QUARANTINE_ATTEMPTS: u32 = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// History store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store document could not be read.
    #[error("history store read failed: {0}")]
    Read(String),
    /// Store I/O error while locking or writing.
    #[error("history store io error: {0}")]
    Io(String),
    /// Store document exceeded the size limit.
    #[error("history store too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual document size in bytes.
        actual_bytes: u64,
    },
    /// Store document could not be serialized.
    #[error("history store serialization failed: {0}")]
    Serialize(String),
    /// Another run held the store lock for too long.
    #[error("history store lock {path} still held after {waited_ms} ms")]
    LockTimeout {
        /// Lock file path.
        path: String,
        /// Time waited in milliseconds.
        waited_ms: u128,
    },
    /// Invalid upsert key.
    #[error("history store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// How a load obtained its starting state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The document parsed successfully.
    Loaded,
    /// No document exists yet.
    Missing,
    /// The document was unreadable and the store was reset to empty.
    Reset {
        /// Parse failure description.
        reason: String,
        /// Where the unreadable document was moved, if the move succeeded.
        quarantined: Option<PathBuf>,
        /// Why the move failed, if it did.
        quarantine_error: Option<String>,
    },
}

/// Store plus the status of the load that produced it.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Loaded store.
    pub store: HistoryStore,
    /// How the store was obtained.
    pub status: LoadStatus,
}

/// Effect of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new (target, date) entry was appended.
    Inserted,
    /// An existing entry gained a new device key.
    AddedDevice,
    /// An existing device record was overwritten.
    Replaced,
}

/// Summary of a prune pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Dates kept, most recent first.
    pub retained_dates: Vec<String>,
    /// Dates dropped, most recent first.
    pub removed_dates: Vec<String>,
    /// Number of entries removed.
    pub removed_entries: usize,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Ordered collection of history entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    /// Entries in insertion order.
    entries: Vec<HistoryEntry>,
}

/// Borrowed serialization view of the store document.
#[derive(Serialize)]
struct DocumentRef<'a> {
    /// Entries in insertion order.
    reports: &'a [HistoryEntry],
}

impl HistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a store from existing entries.
    #[must_use]
    pub const fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries,
        }
    }

    /// Returns the entries in order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry for a (target, date) key.
    #[must_use]
    pub fn find(&self, target: &str, date: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.matches(target, date))
    }

    /// Returns the distinct dates present, most recent first.
    #[must_use]
    pub fn distinct_dates(&self) -> Vec<String> {
        let mut dates: Vec<&str> = self
            .entries
            .iter()
            .map(|entry| entry.date.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        dates.sort_by(|left, right| DateSortKey::new(right).cmp(&DateSortKey::new(left)));
        dates.into_iter().map(str::to_string).collect()
    }

    /// Sets `entry[device_type] = record` for the (target, date) key.
    ///
    /// Other device keys on the same entry are left untouched; a missing entry
    /// is appended.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when `device_type` is empty or collides
    /// with a reserved entry key.
    pub fn upsert(
        &mut self,
        target: &str,
        date: &str,
        device_type: &str,
        record: MetricsRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        if device_type.is_empty() || RESERVED_ENTRY_KEYS.contains(&device_type) {
            return Err(StoreError::Invalid(format!(
                "device key `{device_type}` is empty or reserved"
            )));
        }
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.matches(target, date)) else {
            self.entries.push(HistoryEntry::new(target, date, device_type, record));
            return Ok(UpsertOutcome::Inserted);
        };
        match entry.devices.insert(device_type.to_string(), record) {
            Some(_) => Ok(UpsertOutcome::Replaced),
            None => Ok(UpsertOutcome::AddedDevice),
        }
    }

    /// Keeps only entries whose date is among the `retention_days` most recent.
    pub fn prune(&mut self, retention_days: usize) -> PruneReport {
        let dates = self.distinct_dates();
        if dates.len() <= retention_days {
            return PruneReport {
                retained_dates: dates,
                ..PruneReport::default()
            };
        }
        let (retained, removed) = dates.split_at(retention_days);
        let keep: BTreeSet<&str> = retained.iter().map(String::as_str).collect();
        let before = self.entries.len();
        self.entries.retain(|entry| keep.contains(entry.date.as_str()));
        PruneReport {
            retained_dates: retained.to_vec(),
            removed_dates: removed.to_vec(),
            removed_entries: before - self.entries.len(),
        }
    }

    /// Serializes the store document as pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] when serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let document = DocumentRef {
            reports: &self.entries,
        };
        let mut bytes = serde_json::to_vec_pretty(&document)
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Loads the store at `path`.
    ///
    /// A missing document yields an empty store. A document that fails to
    /// parse is moved aside to a quarantine name and also yields an empty
    /// store; the returned [`LoadStatus`] records what happened.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O failures other than a missing file, or
    /// when the document exceeds [`MAX_STORE_BYTES`].
    pub fn load(path: &Path) -> Result<LoadOutcome, StoreError> {
        let bytes = match read_bytes_with_limit(path, MAX_STORE_BYTES) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => {
                return Ok(LoadOutcome {
                    store: Self::new(),
                    status: LoadStatus::Missing,
                });
            }
            Err(ReadLimitError::TooLarge {
                size,
                limit,
            }) => {
                return Err(StoreError::TooLarge {
                    max_bytes: limit,
                    actual_bytes: size,
                });
            }
            Err(ReadLimitError::Io(err)) => {
                return Err(StoreError::Read(format!("{}: {err}", path.display())));
            }
        };
        match serde_json::from_slice::<HistoryDocument>(&bytes) {
            Ok(document) => Ok(LoadOutcome {
                store: Self::from_entries(document.reports),
                status: LoadStatus::Loaded,
            }),
            Err(err) => {
                let (quarantined, quarantine_error) = match quarantine(path) {
                    Ok(moved) => (Some(moved), None),
                    Err(move_err) => (None, Some(move_err)),
                };
                Ok(LoadOutcome {
                    store: Self::new(),
                    status: LoadStatus::Reset {
                        reason: err.to_string(),
                        quarantined,
                        quarantine_error,
                    },
                })
            }
        }
    }

    /// Writes the store to `path` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when serialization or the write fails; the
    /// previous document stays in place on failure.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.to_json_bytes()?;
        write_atomic(path, &bytes)
            .map_err(|err| StoreError::Io(format!("write {}: {err}", path.display())))
    }
}

// ============================================================================
// SECTION: Locked Transactions
// ============================================================================

/// Result of a locked load-mutate-prune-save cycle.
#[derive(Debug, Clone)]
pub struct Transaction<T> {
    /// Value returned by the mutation.
    pub value: T,
    /// How the starting state was loaded.
    pub load_status: LoadStatus,
    /// What pruning removed.
    pub prune: PruneReport,
    /// Entry count after pruning.
    pub entries: usize,
}

/// Store document path plus the policy for locked updates.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    /// Store document path.
    path: PathBuf,
    /// How long to wait for a competing run.
    lock_timeout: Duration,
}

impl HistoryFile {
    /// Creates a handle for the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Overrides the lock wait timeout.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Runs `mutate` as one atomic read-modify-write against the document.
    ///
    /// The store lock is held from load until the save completes. When
    /// `mutate` fails, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] from locking, loading, the mutation, or saving.
    pub fn transaction<T, F>(
        &self,
        retention_days: usize,
        mutate: F,
    ) -> Result<Transaction<T>, StoreError>
    where
        F: FnOnce(&mut HistoryStore) -> Result<T, StoreError>,
    {
        let lock = StoreLock::acquire(&self.path, self.lock_timeout)?;
        let LoadOutcome {
            mut store,
            status,
        } = HistoryStore::load(&self.path)?;
        let value = mutate(&mut store)?;
        let prune = store.prune(retention_days);
        store.save(&self.path)?;
        drop(lock);
        Ok(Transaction {
            value,
            load_status: status,
            prune,
            entries: store.len(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Moves an unreadable document to `<name>.corrupt-<unix_ms>`.
fn quarantine(path: &Path) -> Result<PathBuf, String> {
    let Some(file_name) = path.file_name() else {
        return Err("store path has no file name".to_string());
    };
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    for attempt in 0 .. QUARANTINE_ATTEMPTS {
        let mut name = file_name.to_os_string();
        if attempt == 0 {
            name.push(format!(".corrupt-{stamp}"));
        } else {
            name.push(format!(".corrupt-{stamp}-{attempt}"));
        }
        let target = path.with_file_name(name);
        if target.exists() {
            continue;
        }
        return fs::rename(path, &target).map(|()| target).map_err(|err| err.to_string());
    }
    Err("no free quarantine file name".to_string())
}
