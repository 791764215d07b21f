// worldwiki-config/src/config.rs
// ============================================================================
// Module: Worldwiki Configuration
// Description: Configuration loading and validation for Worldwiki hosts.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: worldwiki-core, worldwiki-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults; values that are
//! present but out of range fail closed. Converters turn the validated
//! sections into the runtime configs consumed by `worldwiki-core` and
//! `worldwiki-store-sqlite`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use worldwiki_core::OracleDeadlines;
use worldwiki_core::WorkflowConfig;
use worldwiki_store_sqlite::SqliteStoreConfig;
use worldwiki_store_sqlite::SqliteStoreMode;
use worldwiki_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "worldwiki.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "WORLDWIKI_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Default commit attempts for retried workflow operations.
pub(crate) const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;
/// Maximum commit attempts for retried workflow operations.
pub(crate) const MAX_COMMIT_ATTEMPTS: u32 = 16;
/// Maximum accepted minimum name length.
pub(crate) const MAX_MIN_NAME_LENGTH: usize = 255;
/// Default notification channel capacity.
pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;
/// Maximum notification channel capacity.
pub(crate) const MAX_CHANNEL_CAPACITY: usize = 65_536;
/// Default text generation deadline in milliseconds.
pub(crate) const DEFAULT_TEXT_TIMEOUT_MS: u64 = 60_000;
/// Default image generation deadline in milliseconds.
pub(crate) const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 120_000;
/// Maximum oracle deadline in milliseconds.
pub(crate) const MAX_ORACLE_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Worldwiki host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WikiConfig {
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Workflow engine configuration.
    #[serde(default)]
    pub workflow: WorkflowSettings,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditSettings,
    /// Notification sink configuration.
    #[serde(default)]
    pub notifications: NotificationSettings,
    /// Content oracle configuration.
    #[serde(default)]
    pub oracle: OracleSettings,
}

impl WikiConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: the explicit `path`, then `WORLDWIKI_CONFIG`, then
    /// `worldwiki.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::from_bytes(content.as_bytes())
    }

    /// Parses and validates configuration bytes under the size limit.
    fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.workflow.validate()?;
        self.audit.validate()?;
        self.notifications.validate()?;
        self.oracle.validate()?;
        Ok(())
    }

    /// Builds the workflow engine configuration.
    #[must_use]
    pub fn to_workflow_config(&self) -> WorkflowConfig {
        let mut config = self.workflow.to_workflow_config();
        config.oracle_deadlines = self.oracle.deadlines();
        config
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Wiki store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
            }
        }
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be between 1 and {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the `SQLite` store config, or `None` for the memory backend.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Workflow
// ============================================================================

/// Workflow engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSettings {
    /// Commit attempts for operations retried on conflict.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
    /// Archive older open proposals when a version is published.
    #[serde(default = "default_true")]
    pub archive_stale_on_publish: bool,
    /// Seed for deterministic public-id generation.
    #[serde(default)]
    pub public_id_seed: Option<u64>,
    /// Minimum accepted entity name length.
    #[serde(default = "default_min_name_length")]
    pub min_name_length: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_max_commit_attempts(),
            archive_stale_on_publish: true,
            public_id_seed: None,
            min_name_length: default_min_name_length(),
        }
    }
}

impl WorkflowSettings {
    /// Validates workflow settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commit_attempts == 0 || self.max_commit_attempts > MAX_COMMIT_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "workflow.max_commit_attempts must be between 1 and {MAX_COMMIT_ATTEMPTS}"
            )));
        }
        if self.min_name_length == 0 || self.min_name_length > MAX_MIN_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "workflow.min_name_length must be between 1 and {MAX_MIN_NAME_LENGTH}"
            )));
        }
        Ok(())
    }

    /// Builds a workflow config with default oracle deadlines.
    #[must_use]
    pub fn to_workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            max_commit_attempts: self.max_commit_attempts,
            archive_stale_on_publish: self.archive_stale_on_publish,
            public_id_seed: self.public_id_seed,
            min_name_length: self.min_name_length,
            oracle_deadlines: OracleDeadlines::default(),
        }
    }
}

/// Returns the default commit attempt budget.
const fn default_max_commit_attempts() -> u32 {
    DEFAULT_MAX_COMMIT_ATTEMPTS
}

/// Returns the default minimum name length.
const fn default_min_name_length() -> usize {
    1
}

/// Returns true for serde defaults.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Audit And Notifications
// ============================================================================

/// Audit sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    /// Whether audit events are recorded.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON-lines audit file; standard error when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditSettings {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Notification sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    /// Whether notifications are emitted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bounded channel capacity for async delivery.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl NotificationSettings {
    /// Validates notification settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "notifications.channel_capacity must be between 1 and {MAX_CHANNEL_CAPACITY}"
            )));
        }
        Ok(())
    }
}

/// Returns the default notification channel capacity.
const fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

// ============================================================================
// SECTION: Oracle
// ============================================================================

/// Content oracle deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleSettings {
    /// Text generation deadline in milliseconds.
    #[serde(default = "default_text_timeout_ms")]
    pub text_timeout_ms: u64,
    /// Image generation deadline in milliseconds.
    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            text_timeout_ms: default_text_timeout_ms(),
            image_timeout_ms: default_image_timeout_ms(),
        }
    }
}

impl OracleSettings {
    /// Validates oracle deadlines.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("oracle.text_timeout_ms", self.text_timeout_ms),
            ("oracle.image_timeout_ms", self.image_timeout_ms),
        ] {
            if value == 0 || value > MAX_ORACLE_TIMEOUT_MS {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be between 1 and {MAX_ORACLE_TIMEOUT_MS}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the per-call oracle deadlines.
    #[must_use]
    pub const fn deadlines(&self) -> OracleDeadlines {
        OracleDeadlines {
            text: Duration::from_millis(self.text_timeout_ms),
            image: Duration::from_millis(self.image_timeout_ms),
        }
    }
}

/// Returns the default text generation deadline.
const fn default_text_timeout_ms() -> u64 {
    DEFAULT_TEXT_TIMEOUT_MS
}

/// Returns the default image generation deadline.
const fn default_image_timeout_ms() -> u64 {
    DEFAULT_IMAGE_TIMEOUT_MS
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
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
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

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
