// crates/perf-ledger-config/src/config.rs
// ============================================================================
// Module: Perf Ledger Configuration
// Description: Configuration loading and validation for perf-ledger.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: perf-ledger-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is optional: without an explicit path, an environment override,
//! or a `perf-ledger.toml` in the working directory, built-in defaults apply.
//! An explicitly named file that is missing or invalid fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use perf_ledger_core::ingest::validate_device;
use perf_ledger_core::ingest::validate_target;
use perf_ledger_core::store::DEFAULT_RETENTION_DAYS;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "perf-ledger.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PERF_LEDGER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default store document path.
const DEFAULT_STORE_PATH: &str = "reports/main-history.json";
/// Default lock wait in milliseconds.
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;
/// Maximum lock wait in milliseconds.
const MAX_LOCK_TIMEOUT_MS: u64 = 600_000;
/// Maximum retention window in distinct dates.
const MAX_RETENTION_DAYS: usize = 3650;
/// Maximum number of configured device types.
const MAX_DEVICE_TYPES: usize = 64;
/// Default target for the environment-driven mode.
const DEFAULT_TARGET: &str = "https://example.org";

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level perf-ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerfLedgerConfig {
    /// History store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Report artifact settings.
    #[serde(default)]
    pub reports: ReportsConfig,
    /// Defaults for the environment-driven mode.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Event logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Path the config was loaded from, if any (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// History store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store document path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Number of distinct dates retained.
    #[serde(default = "default_retention_days")]
    pub retention_days: usize,
    /// Maximum wait for a competing run, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            retention_days: default_retention_days(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Returns the lock timeout as a duration.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Validates store settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.retention_days == 0 {
            return Err(ConfigError::Invalid(
                "store.retention_days must be greater than zero".to_string(),
            ));
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::Invalid(format!(
                "store.retention_days must be at most {MAX_RETENTION_DAYS}"
            )));
        }
        if !(1 ..= MAX_LOCK_TIMEOUT_MS).contains(&self.lock_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "store.lock_timeout_ms must be between 1 and {MAX_LOCK_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Report artifact settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportsConfig {
    /// Directory report references are made relative to.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl ReportsConfig {
    /// Validates report settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_dir) = &self.base_dir {
            validate_path_string("reports.base_dir", &base_dir.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Defaults applied by the environment-driven mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Target used when `TARGET` is unset.
    #[serde(default = "default_target")]
    pub target: String,
    /// Accepted device keys; empty accepts any well-formed key.
    #[serde(default = "default_device_types")]
    pub device_types: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            device_types: default_device_types(),
        }
    }
}

impl DefaultsConfig {
    /// Validates default settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_target(&self.target)
            .map_err(|err| ConfigError::Invalid(format!("defaults.target: {err}")))?;
        if self.device_types.len() > MAX_DEVICE_TYPES {
            return Err(ConfigError::Invalid(format!(
                "defaults.device_types exceeds {MAX_DEVICE_TYPES} entries"
            )));
        }
        for (index, device) in self.device_types.iter().enumerate() {
            validate_device(device, &[]).map_err(|err| {
                ConfigError::Invalid(format!("defaults.device_types[{index}]: {err}"))
            })?;
            if self.device_types[.. index].contains(device) {
                return Err(ConfigError::Invalid(format!(
                    "defaults.device_types contains duplicate `{device}`"
                )));
            }
        }
        Ok(())
    }
}

/// Event sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Events discarded.
    None,
}

/// Event logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Where events go.
    #[serde(default)]
    pub sink: LogSink,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSink::File, None) => {
                Err(ConfigError::Invalid("logging.path is required for the file sink".to_string()))
            }
            (LogSink::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())
            }
            (LogSink::Stderr | LogSink::None, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid for the file sink".to_string(),
            )),
            (LogSink::Stderr | LogSink::None, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl PerfLedgerConfig {
    /// Loads configuration using the process environment for overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads configuration, resolving overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(resolved) = resolve_path(path, &lookup)? else {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source = Some(resolved);
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.reports.validate()?;
        self.defaults.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns the directory report references are made relative to.
    #[must_use]
    pub fn report_base_dir(&self) -> Option<&Path> {
        self.reports.base_dir.as_deref()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A required environment variable is unset.
    #[error("environment variable {0} is required")]
    MissingEnv(&'static str),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns `None` when no path was named and the default file is absent.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default_path.is_file().then_some(default_path))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default store document path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Default retention window.
const fn default_retention_days() -> usize {
    DEFAULT_RETENTION_DAYS
}

/// Default lock wait in milliseconds.
const fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

/// Default target for the environment-driven mode.
fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

/// Default device keys.
fn default_device_types() -> Vec<String> {
    vec!["desktop".to_string(), "mobile".to_string()]
}
