// worldwiki-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Wiki Store
// Description: Durable WikiStore and audit log backed by SQLite.
// Purpose: Persist entities, versions, periods, and actors with atomic batches.
// Dependencies: worldwiki-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`WikiStore`] using `SQLite`. Each record
//! is stored as a JSON document next to the indexed columns that queries and
//! relational constraints need. A batch commit runs inside one immediate
//! transaction: preconditions are checked, writes are applied, and deferred
//! foreign keys are verified at commit, so a failed batch leaves no trace.
//! Policy filters compile to `WHERE` clauses so restricted rows never leave
//! the database. Security posture: database contents are untrusted; loads
//! fail closed on oversized or mismatched records.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use worldwiki_core::Actor;
use worldwiki_core::ActorId;
use worldwiki_core::ActorStore;
use worldwiki_core::AuditError;
use worldwiki_core::AuditEvent;
use worldwiki_core::AuditSink;
use worldwiki_core::Entity;
use worldwiki_core::EntityQuery;
use worldwiki_core::EntityStore;
use worldwiki_core::Hid;
use worldwiki_core::PeriodId;
use worldwiki_core::PeriodStore;
use worldwiki_core::PeriodVersion;
use worldwiki_core::Precondition;
use worldwiki_core::ProposalFilter;
use worldwiki_core::PublicId;
use worldwiki_core::StoreError;
use worldwiki_core::TimelinePeriod;
use worldwiki_core::TrashScope;
use worldwiki_core::Version;
use worldwiki_core::VersionQuery;
use worldwiki_core::VersionStore;
use worldwiki_core::VisibilityFilter;
use worldwiki_core::WikiStore;
use worldwiki_core::WriteBatch;
use worldwiki_core::WriteOp;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized record size accepted by the store.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` wiki store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or key mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// A precondition or uniqueness constraint failed.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Record exceeded the size limit.
    #[error("sqlite store record too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual record size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "record exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps engine errors, classifying constraint violations.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return SqliteStoreError::Conflict(err.to_string());
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return SqliteStoreError::Invalid(err.to_string());
            }
            _ => {}
        }
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed wiki store with WAL support.
#[derive(Clone)]
pub struct SqliteWikiStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteWikiStore {
    /// Opens an `SQLite`-backed wiki store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Lists recorded audit events in insertion order, optionally for one
    /// target.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the audit log cannot be read.
    pub fn list_audit(
        &self,
        target_id: Option<&str>,
    ) -> Result<Vec<AuditEvent>, SqliteStoreError> {
        self.with_connection(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT record FROM audit_log WHERE (?1 IS NULL OR target_id = ?1) ORDER BY \
                     seq",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![target_id], |row| row.get::<_, String>(0))
                .map_err(db_error)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(decode(&row.map_err(db_error)?)?);
            }
            Ok(events)
        })
    }

    /// Runs a closure against the locked connection.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let result = f(&guard);
        drop(guard);
        result
    }

    /// Commits a batch inside one immediate transaction.
    fn commit_batch(&self, batch: &WriteBatch) -> Result<(), SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        for precondition in &batch.preconditions {
            check_precondition(&tx, precondition)?;
        }
        for op in &batch.writes {
            apply_write(&tx, op)?;
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }
}

// ============================================================================//
// SECTION: Read Traits
// ============================================================================//

impl EntityStore for SqliteWikiStore {
    fn entity(&self, hid: &Hid) -> Result<Option<Entity>, StoreError> {
        self.with_connection(|connection| {
            let record = connection
                .query_row(
                    "SELECT record FROM entities WHERE hid = ?1",
                    params![hid.as_str()],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(db_error)?;
            record.map(|record| decode_entity(&record, Some(hid))).transpose()
        })
        .map_err(StoreError::from)
    }

    fn entity_by_public_id(&self, public_id: &PublicId) -> Result<Option<Entity>, StoreError> {
        self.with_connection(|connection| {
            let record = connection
                .query_row(
                    "SELECT record FROM entities WHERE public_id = ?1",
                    params![public_id.as_str()],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(db_error)?;
            record.map(|record| decode_entity(&record, None)).transpose()
        })
        .map_err(StoreError::from)
    }

    fn query_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        let (sql, values) = entity_query_sql(query);
        self.with_connection(|connection| {
            let records = query_records(connection, &sql, values)?;
            records.iter().map(|record| decode_entity(record, None)).collect()
        })
        .map_err(StoreError::from)
    }
}

impl VersionStore for SqliteWikiStore {
    fn version(&self, hid: &Hid, number: u64) -> Result<Option<Version>, StoreError> {
        let number = to_sql_int(number, "version number")?;
        self.with_connection(|connection| {
            let record = connection
                .query_row(
                    "SELECT record FROM versions WHERE hid = ?1 AND version_number = ?2",
                    params![hid.as_str(), number],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(db_error)?;
            record.map(|record| decode(&record)).transpose()
        })
        .map_err(StoreError::from)
    }

    fn versions(&self, hid: &Hid) -> Result<Vec<Version>, StoreError> {
        self.with_connection(|connection| {
            let records = query_records(
                connection,
                "SELECT record FROM versions WHERE hid = ? ORDER BY version_number",
                vec![SqlValue::Text(hid.as_str().to_string())],
            )?;
            records.iter().map(|record| decode(record)).collect()
        })
        .map_err(StoreError::from)
    }

    fn query_versions(&self, query: &VersionQuery) -> Result<Vec<Version>, StoreError> {
        let (sql, values) = version_query_sql(query);
        self.with_connection(|connection| {
            let records = query_records(connection, &sql, values)?;
            records.iter().map(|record| decode(record)).collect()
        })
        .map_err(StoreError::from)
    }
}

impl PeriodStore for SqliteWikiStore {
    fn period(&self, id: &PeriodId) -> Result<Option<TimelinePeriod>, StoreError> {
        self.with_connection(|connection| {
            let record = connection
                .query_row("SELECT record FROM periods WHERE id = ?1", params![id.as_str()], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
                .map_err(db_error)?;
            record.map(|record| decode(&record)).transpose()
        })
        .map_err(StoreError::from)
    }

    fn periods(&self, hid: &Hid) -> Result<Vec<TimelinePeriod>, StoreError> {
        self.with_connection(|connection| {
            let records = query_records(
                connection,
                "SELECT record FROM periods WHERE hid = ?",
                vec![SqlValue::Text(hid.as_str().to_string())],
            )?;
            let mut periods =
                records.iter().map(|record| decode(record)).collect::<Result<Vec<_>, _>>()?;
            sort_periods(&mut periods);
            Ok(periods)
        })
        .map_err(StoreError::from)
    }

    fn period_version(
        &self,
        id: &PeriodId,
        number: i64,
    ) -> Result<Option<PeriodVersion>, StoreError> {
        self.with_connection(|connection| {
            let record = connection
                .query_row(
                    "SELECT record FROM period_versions WHERE period_id = ?1 AND version_number = \
                     ?2",
                    params![id.as_str(), number],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(db_error)?;
            record.map(|record| decode(&record)).transpose()
        })
        .map_err(StoreError::from)
    }

    fn period_versions(&self, id: &PeriodId) -> Result<Vec<PeriodVersion>, StoreError> {
        self.with_connection(|connection| {
            let records = query_records(
                connection,
                "SELECT record FROM period_versions WHERE period_id = ? ORDER BY version_number",
                vec![SqlValue::Text(id.as_str().to_string())],
            )?;
            records.iter().map(|record| decode(record)).collect()
        })
        .map_err(StoreError::from)
    }
}

impl ActorStore for SqliteWikiStore {
    fn actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        self.with_connection(|connection| {
            let record = connection
                .query_row("SELECT record FROM actors WHERE id = ?1", params![id.as_str()], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
                .map_err(db_error)?;
            record.map(|record| load_actor(connection, &record)).transpose()
        })
        .map_err(StoreError::from)
    }

    fn actors(&self) -> Result<Vec<Actor>, StoreError> {
        self.with_connection(|connection| {
            let records =
                query_records(connection, "SELECT record FROM actors ORDER BY id", Vec::new())?;
            records.iter().map(|record| load_actor(connection, record)).collect()
        })
        .map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Commit
// ============================================================================//

impl WikiStore for SqliteWikiStore {
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.commit_batch(batch).map_err(StoreError::from)
    }
}

/// Checks one precondition inside the commit transaction.
fn check_precondition(
    tx: &Transaction<'_>,
    precondition: &Precondition,
) -> Result<(), SqliteStoreError> {
    let holds = match precondition {
        Precondition::EntityAbsent(hid) => {
            !exists(tx, "SELECT 1 FROM entities WHERE hid = ?1", params![hid.as_str()])?
        }
        Precondition::PublicIdAbsent(public_id) => !exists(
            tx,
            "SELECT 1 FROM entities WHERE public_id = ?1",
            params![public_id.as_str()],
        )?,
        Precondition::EntityRevision {
            hid,
            revision,
        } => exists(
            tx,
            "SELECT 1 FROM entities WHERE hid = ?1 AND revision = ?2",
            params![hid.as_str(), to_sql_int(*revision, "revision")?],
        )?,
        Precondition::VersionAbsent {
            hid,
            number,
        } => !exists(
            tx,
            "SELECT 1 FROM versions WHERE hid = ?1 AND version_number = ?2",
            params![hid.as_str(), to_sql_int(*number, "version number")?],
        )?,
        Precondition::VersionStatus {
            hid,
            number,
            status,
        } => exists(
            tx,
            "SELECT 1 FROM versions WHERE hid = ?1 AND version_number = ?2 AND status = ?3",
            params![hid.as_str(), to_sql_int(*number, "version number")?, status.as_str()],
        )?,
        Precondition::PeriodSlugAbsent {
            hid,
            slug,
        } => !exists(
            tx,
            "SELECT 1 FROM periods WHERE hid = ?1 AND slug = ?2",
            params![hid.as_str(), slug],
        )?,
        Precondition::PeriodRevision {
            id,
            revision,
        } => exists(
            tx,
            "SELECT 1 FROM periods WHERE id = ?1 AND revision = ?2",
            params![id.as_str(), to_sql_int(*revision, "revision")?],
        )?,
        Precondition::PeriodAbsent(id) => {
            !exists(tx, "SELECT 1 FROM periods WHERE id = ?1", params![id.as_str()])?
        }
        Precondition::PeriodVersionAbsent {
            id,
            number,
        } => !exists(
            tx,
            "SELECT 1 FROM period_versions WHERE period_id = ?1 AND version_number = ?2",
            params![id.as_str(), number],
        )?,
        Precondition::PeriodVersionStatus {
            id,
            number,
            status,
        } => exists(
            tx,
            "SELECT 1 FROM period_versions WHERE period_id = ?1 AND version_number = ?2 AND \
             status = ?3",
            params![id.as_str(), number, status.as_str()],
        )?,
        Precondition::ActorAbsent(id) => {
            !exists(tx, "SELECT 1 FROM actors WHERE id = ?1", params![id.as_str()])?
        }
    };
    if holds {
        Ok(())
    } else {
        Err(SqliteStoreError::Conflict(format!("precondition failed: {precondition}")))
    }
}

/// Applies one write inside the commit transaction.
fn apply_write(tx: &Transaction<'_>, op: &WriteOp) -> Result<(), SqliteStoreError> {
    match op {
        WriteOp::PutEntity(entity) => {
            tx.execute(
                "INSERT INTO entities (hid, public_id, status, visibility_public, author, \
                 is_active, current_version_number, revision, record) VALUES (?1, ?2, ?3, ?4, \
                 ?5, ?6, ?7, ?8, ?9) ON CONFLICT(hid) DO UPDATE SET public_id = \
                 excluded.public_id, status = excluded.status, visibility_public = \
                 excluded.visibility_public, author = excluded.author, is_active = \
                 excluded.is_active, current_version_number = excluded.current_version_number, \
                 revision = excluded.revision, record = excluded.record",
                params![
                    entity.hid.as_str(),
                    entity.public_id.as_str(),
                    entity.status.as_str(),
                    entity.visibility_public,
                    entity.author.as_ref().map(ActorId::as_str),
                    entity.is_active,
                    to_sql_int(entity.current_version_number, "current version number")?,
                    to_sql_int(entity.revision, "revision")?,
                    encode(entity)?
                ],
            )
            .map_err(db_error)?;
        }
        WriteOp::DeleteEntity(hid) => {
            tx.execute("DELETE FROM entities WHERE hid = ?1", params![hid.as_str()])
                .map_err(db_error)?;
        }
        WriteOp::PutVersion(version) => {
            tx.execute(
                "INSERT INTO versions (hid, version_number, status, author, record) VALUES (?1, \
                 ?2, ?3, ?4, ?5) ON CONFLICT(hid, version_number) DO UPDATE SET status = \
                 excluded.status, author = excluded.author, record = excluded.record",
                params![
                    version.hid.as_str(),
                    to_sql_int(version.version_number, "version number")?,
                    version.status.as_str(),
                    version.author.as_ref().map(ActorId::as_str),
                    encode(version)?
                ],
            )
            .map_err(db_error)?;
        }
        WriteOp::PutPeriod(period) => {
            tx.execute(
                "INSERT INTO periods (id, hid, slug, is_current, revision, record) VALUES (?1, \
                 ?2, ?3, ?4, ?5, ?6) ON CONFLICT(id) DO UPDATE SET hid = excluded.hid, slug = \
                 excluded.slug, is_current = excluded.is_current, revision = excluded.revision, \
                 record = excluded.record",
                params![
                    period.id.as_str(),
                    period.hid.as_str(),
                    period.slug,
                    period.is_current,
                    to_sql_int(period.revision, "revision")?,
                    encode(period)?
                ],
            )
            .map_err(db_error)?;
        }
        WriteOp::DeletePeriod(id) => {
            tx.execute("DELETE FROM periods WHERE id = ?1", params![id.as_str()])
                .map_err(db_error)?;
        }
        WriteOp::PutPeriodVersion(version) => {
            tx.execute(
                "INSERT INTO period_versions (period_id, version_number, status, record) VALUES \
                 (?1, ?2, ?3, ?4) ON CONFLICT(period_id, version_number) DO UPDATE SET status = \
                 excluded.status, record = excluded.record",
                params![
                    version.period_id.as_str(),
                    version.version_number,
                    version.status.as_str(),
                    encode(version)?
                ],
            )
            .map_err(db_error)?;
        }
        WriteOp::PutActor(actor) => {
            tx.execute(
                "INSERT INTO actors (id, record) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET \
                 record = excluded.record",
                params![actor.id.as_str(), encode(actor)?],
            )
            .map_err(db_error)?;
            tx.execute("DELETE FROM actor_bosses WHERE minion = ?1", params![actor.id.as_str()])
                .map_err(db_error)?;
            for boss in &actor.bosses {
                tx.execute(
                    "INSERT INTO actor_bosses (minion, boss) VALUES (?1, ?2)",
                    params![actor.id.as_str(), boss.as_str()],
                )
                .map_err(db_error)?;
            }
        }
        WriteOp::DeleteActor(id) => {
            tx.execute("DELETE FROM actors WHERE id = ?1", params![id.as_str()])
                .map_err(db_error)?;
            tx.execute("DELETE FROM actor_bosses WHERE boss = ?1", params![id.as_str()])
                .map_err(db_error)?;
        }
    }
    Ok(())
}

// ============================================================================//
// SECTION: Audit Log
// ============================================================================//

impl AuditSink for SqliteWikiStore {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let record = serde_json::to_string(event)
            .map_err(|err| AuditError::Serialization(err.to_string()))?;
        self.with_connection(|connection| {
            connection
                .execute(
                    "INSERT INTO audit_log (actor, action, target_id, record) VALUES (?1, ?2, ?3, \
                     ?4)",
                    params![
                        event.actor.as_ref().map(ActorId::as_str),
                        event.action.as_str(),
                        event.target_id,
                        record
                    ],
                )
                .map_err(db_error)?;
            Ok(())
        })
        .map_err(|err| AuditError::Store(err.to_string()))
    }
}

// ============================================================================//
// SECTION: Filter Compilation
// ============================================================================//

/// Builds the entity list query for a filter.
fn entity_query_sql(query: &EntityQuery) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    match query.scope {
        TrashScope::Active => clauses.push("is_active = 1".to_string()),
        TrashScope::Trashed => clauses.push("is_active = 0".to_string()),
        TrashScope::Any => {}
    }
    if let Some(prefix) = &query.prefix {
        clauses.push("substr(hid, 1, ?) = ?".to_string());
        values.push(SqlValue::Integer(sql_len(prefix.len())));
        values.push(SqlValue::Text(prefix.as_str().to_string()));
    }
    if let Some(length) = query.length {
        clauses.push("length(hid) = ?".to_string());
        values.push(SqlValue::Integer(sql_len(length)));
    }
    if let VisibilityFilter::Restricted(rules) = &query.filter {
        let mut admitted =
            vec!["(status IN ('LIVE', 'LOCKED') AND visibility_public = 1)".to_string()];
        if let Some(viewer) = &rules.viewer {
            admitted.push("author = ?".to_string());
            values.push(SqlValue::Text(viewer.as_str().to_string()));
        }
        let mut published = Vec::new();
        if !rules.team_authors.is_empty() {
            published.push(format!("author IN ({})", placeholders(rules.team_authors.len())));
            values.extend(actor_values(&rules.team_authors));
        }
        if rules.system_owned {
            if rules.superusers.is_empty() {
                published.push("author IS NULL".to_string());
            } else {
                published.push(format!(
                    "(author IS NULL OR author IN ({}))",
                    placeholders(rules.superusers.len())
                ));
                values.extend(actor_values(&rules.superusers));
            }
        }
        if !published.is_empty() {
            admitted.push(format!("(current_version_number > 0 AND ({}))", published.join(" OR ")));
        }
        clauses.push(format!("({})", admitted.join(" OR ")));
    }
    (format!("SELECT record FROM entities{} ORDER BY hid", where_clause(&clauses)), values)
}

/// Builds the version list query for a dashboard filter.
fn version_query_sql(query: &VersionQuery) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(hid) = &query.hid {
        clauses.push("v.hid = ?".to_string());
        values.push(SqlValue::Text(hid.as_str().to_string()));
    }
    if !query.statuses.is_empty() {
        clauses.push(format!("v.status IN ({})", placeholders(query.statuses.len())));
        values.extend(
            query.statuses.iter().map(|status| SqlValue::Text(status.as_str().to_string())),
        );
    }
    if let ProposalFilter::Silo(silo) = &query.filter {
        let viewer = SqlValue::Text(silo.viewer.as_str().to_string());
        let mut admitted = vec!["v.author = ?".to_string(), "e.author = ?".to_string()];
        values.push(viewer.clone());
        values.push(viewer);
        if !silo.minions.is_empty() {
            let minions = placeholders(silo.minions.len());
            values.extend(actor_values(&silo.minions));
            if silo.reviews_minions {
                admitted.push(format!("v.author IN ({minions})"));
            } else {
                admitted.push(format!("(v.author IN ({minions}) AND e.author IN ({minions}))"));
                values.extend(actor_values(&silo.minions));
            }
        }
        clauses.push(format!("({})", admitted.join(" OR ")));
    }
    (
        format!(
            "SELECT v.record FROM versions v LEFT JOIN entities e ON e.hid = v.hid{} ORDER BY \
             v.hid, v.version_number",
            where_clause(&clauses)
        ),
        values,
    )
}

/// Joins clauses into a `WHERE` suffix.
fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

/// Returns `count` comma-separated positional placeholders.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Converts an actor set into bound values.
fn actor_values(actors: &BTreeSet<ActorId>) -> impl Iterator<Item = SqlValue> + '_ {
    actors.iter().map(|actor| SqlValue::Text(actor.as_str().to_string()))
}

/// Converts a HID length into an `SQLite` integer.
fn sql_len(length: usize) -> i64 {
    i64::try_from(length).unwrap_or(i64::MAX)
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Orders periods by `(order, created_at, id)`.
fn sort_periods(periods: &mut [TimelinePeriod]) {
    periods.sort_by(|left, right| {
        (left.order, left.created_at, &left.id).cmp(&(right.order, right.created_at, &right.id))
    });
}

/// Runs a query returning one JSON record column.
fn query_records(
    connection: &Connection,
    sql: &str,
    values: Vec<SqlValue>,
) -> Result<Vec<String>, SqliteStoreError> {
    let mut statement = connection.prepare(sql).map_err(db_error)?;
    let rows = statement
        .query_map(params_from_iter(values), |row| row.get::<_, String>(0))
        .map_err(db_error)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(db_error)?);
    }
    Ok(records)
}

/// Returns true when the query yields a row.
fn exists(
    tx: &Transaction<'_>,
    sql: &str,
    values: impl rusqlite::Params,
) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> =
        tx.query_row(sql, values, |row| row.get(0)).optional().map_err(db_error)?;
    Ok(found.is_some())
}

/// Loads an actor record and its supervision edges.
fn load_actor(connection: &Connection, record: &str) -> Result<Actor, SqliteStoreError> {
    let mut actor: Actor = decode(record)?;
    let mut statement = connection
        .prepare("SELECT boss FROM actor_bosses WHERE minion = ?1 ORDER BY boss")
        .map_err(db_error)?;
    let rows = statement
        .query_map(params![actor.id.as_str()], |row| row.get::<_, String>(0))
        .map_err(db_error)?;
    let mut bosses = BTreeSet::new();
    for row in rows {
        bosses.insert(ActorId::new(row.map_err(db_error)?));
    }
    actor.bosses = bosses;
    Ok(actor)
}

/// Decodes an entity and verifies it matches its key.
fn decode_entity(record: &str, expected: Option<&Hid>) -> Result<Entity, SqliteStoreError> {
    let entity: Entity = decode(record)?;
    if expected.is_some_and(|hid| *hid != entity.hid) {
        return Err(SqliteStoreError::Corrupt(format!(
            "hid mismatch between key and record {}",
            entity.hid
        )));
    }
    Ok(entity)
}

/// Decodes a JSON record with the size limit enforced.
fn decode<T: DeserializeOwned>(record: &str) -> Result<T, SqliteStoreError> {
    if record.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: record.len(),
        });
    }
    serde_json::from_str(record).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

/// Encodes a JSON record with the size limit enforced.
fn encode<T: Serialize>(value: &T) -> Result<String, SqliteStoreError> {
    let record =
        serde_json::to_string(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if record.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: record.len(),
        });
    }
    Ok(record)
}

/// Converts an unsigned counter into an `SQLite` integer.
fn to_sql_int(value: u64, field: &str) -> Result<i64, SqliteStoreError> {
    i64::try_from(value).map_err(|_| SqliteStoreError::Invalid(format!("{field} out of range")))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS entities (
                    hid TEXT PRIMARY KEY,
                    public_id TEXT NOT NULL UNIQUE,
                    status TEXT NOT NULL,
                    visibility_public INTEGER NOT NULL,
                    author TEXT,
                    is_active INTEGER NOT NULL,
                    current_version_number INTEGER NOT NULL,
                    revision INTEGER NOT NULL,
                    record TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_entities_active_length
                    ON entities (is_active, length(hid));
                CREATE INDEX IF NOT EXISTS idx_entities_author ON entities (author);
                CREATE TABLE IF NOT EXISTS versions (
                    hid TEXT NOT NULL,
                    version_number INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    author TEXT,
                    record TEXT NOT NULL,
                    PRIMARY KEY (hid, version_number),
                    FOREIGN KEY (hid) REFERENCES entities(hid)
                        ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
                );
                CREATE INDEX IF NOT EXISTS idx_versions_status ON versions (status);
                CREATE TABLE IF NOT EXISTS periods (
                    id TEXT PRIMARY KEY,
                    hid TEXT NOT NULL,
                    slug TEXT NOT NULL,
                    is_current INTEGER NOT NULL,
                    revision INTEGER NOT NULL,
                    record TEXT NOT NULL,
                    UNIQUE (hid, slug),
                    FOREIGN KEY (hid) REFERENCES entities(hid)
                        ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_periods_current
                    ON periods (hid) WHERE is_current = 1;
                CREATE TABLE IF NOT EXISTS period_versions (
                    period_id TEXT NOT NULL,
                    version_number INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    record TEXT NOT NULL,
                    PRIMARY KEY (period_id, version_number),
                    FOREIGN KEY (period_id) REFERENCES periods(id)
                        ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
                );
                CREATE TABLE IF NOT EXISTS actors (
                    id TEXT PRIMARY KEY,
                    record TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS actor_bosses (
                    minion TEXT NOT NULL,
                    boss TEXT NOT NULL,
                    PRIMARY KEY (minion, boss),
                    FOREIGN KEY (minion) REFERENCES actors(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_actor_bosses_boss ON actor_bosses (boss);
                CREATE TABLE IF NOT EXISTS audit_log (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    actor TEXT,
                    action TEXT NOT NULL,
                    target_id TEXT NOT NULL,
                    record TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_audit_log_target ON audit_log (target_id);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
