// worldwiki-core/src/interfaces/mod.rs
// ============================================================================
// Module: Worldwiki Interfaces
// Description: Backend-agnostic interfaces for storage, audit, notifications, and oracles.
// Purpose: Define the contract surfaces used by the Worldwiki runtime.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the workflow integrates with persistence and side
//! effects without embedding backend details. Stores commit a
//! [`WriteBatch`] atomically: every precondition is checked against the
//! current state, then every write is applied, or nothing is. Stores filter
//! list queries with the policy-provided filters so restricted rows never
//! leave the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::Actor;
use crate::core::ActorDirectory;
use crate::core::ActorId;
use crate::core::AuditEvent;
use crate::core::Entity;
use crate::core::Hid;
use crate::core::Notification;
use crate::core::PeriodId;
use crate::core::PeriodVersion;
use crate::core::ProposalFilter;
use crate::core::PublicId;
use crate::core::TimelinePeriod;
use crate::core::Version;
use crate::core::VersionStatus;
use crate::core::VisibilityFilter;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Wiki store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("wiki store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("wiki store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("wiki store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("wiki store invalid data: {0}")]
    Invalid(String),
    /// A write precondition no longer holds.
    #[error("wiki store conflict: {0}")]
    Conflict(String),
    /// Store reported an error.
    #[error("wiki store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Trash partition selected by an entity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashScope {
    /// Active entities only.
    Active,
    /// Soft-deleted entities only.
    Trashed,
    /// Both partitions.
    Any,
}

/// Entity list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    /// HID prefix (inclusive of the prefix entity itself).
    pub prefix: Option<Hid>,
    /// Exact HID length.
    pub length: Option<usize>,
    /// Visibility filter applied inside the store.
    pub filter: VisibilityFilter,
    /// Trash partition.
    pub scope: TrashScope,
}

impl EntityQuery {
    /// Query for every active entity without visibility restriction.
    #[must_use]
    pub const fn active() -> Self {
        Self {
            prefix: None,
            length: None,
            filter: VisibilityFilter::Everything,
            scope: TrashScope::Active,
        }
    }

    /// Returns a copy restricted to a HID prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Hid) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Returns a copy restricted to an exact HID length.
    #[must_use]
    pub const fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Returns a copy with a visibility filter.
    #[must_use]
    pub fn with_filter(mut self, filter: VisibilityFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns a copy with a trash scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: TrashScope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns true when the entity satisfies the query.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        let in_scope = match self.scope {
            TrashScope::Active => entity.is_active,
            TrashScope::Trashed => !entity.is_active,
            TrashScope::Any => true,
        };
        in_scope
            && self
                .prefix
                .as_ref()
                .is_none_or(|prefix| entity.hid.as_str().starts_with(prefix.as_str()))
            && self.length.is_none_or(|length| entity.hid.len() == length)
            && self.filter.matches(entity)
    }
}

/// Version list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionQuery {
    /// Restrict to a single entity.
    pub hid: Option<Hid>,
    /// Restrict to statuses (empty means any).
    pub statuses: Vec<VersionStatus>,
    /// Dashboard filter applied inside the store.
    pub filter: ProposalFilter,
}

impl VersionQuery {
    /// Returns true when the version satisfies the query.
    #[must_use]
    pub fn matches(&self, version: &Version, entity_author: Option<&ActorId>) -> bool {
        self.hid.as_ref().is_none_or(|hid| *hid == version.hid)
            && (self.statuses.is_empty() || self.statuses.contains(&version.status))
            && self.filter.matches(version, entity_author)
    }
}

// ============================================================================
// SECTION: Write Batches
// ============================================================================

/// Condition that must hold when a batch commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// No entity exists at the HID.
    EntityAbsent(Hid),
    /// No entity carries the public ID.
    PublicIdAbsent(PublicId),
    /// The entity exists with the given revision.
    EntityRevision {
        /// Entity HID.
        hid: Hid,
        /// Expected revision.
        revision: u64,
    },
    /// The entity has no version with the number.
    VersionAbsent {
        /// Entity HID.
        hid: Hid,
        /// Version number.
        number: u64,
    },
    /// The version exists with the given status.
    VersionStatus {
        /// Entity HID.
        hid: Hid,
        /// Version number.
        number: u64,
        /// Expected status.
        status: VersionStatus,
    },
    /// No period of the entity uses the slug.
    PeriodSlugAbsent {
        /// Entity HID.
        hid: Hid,
        /// Slug.
        slug: String,
    },
    /// The period exists with the given revision.
    PeriodRevision {
        /// Period identifier.
        id: PeriodId,
        /// Expected revision.
        revision: u64,
    },
    /// No period exists with the identifier.
    PeriodAbsent(PeriodId),
    /// The period has no version with the number.
    PeriodVersionAbsent {
        /// Period identifier.
        id: PeriodId,
        /// Version number.
        number: i64,
    },
    /// The period version exists with the given status.
    PeriodVersionStatus {
        /// Period identifier.
        id: PeriodId,
        /// Version number.
        number: i64,
        /// Expected status.
        status: VersionStatus,
    },
    /// No actor exists with the identity.
    ActorAbsent(ActorId),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntityAbsent(hid) => write!(f, "entity {hid} absent"),
            Self::PublicIdAbsent(public_id) => write!(f, "public id {public_id} absent"),
            Self::EntityRevision {
                hid,
                revision,
            } => write!(f, "entity {hid} at revision {revision}"),
            Self::VersionAbsent {
                hid,
                number,
            } => write!(f, "version {hid}/{number} absent"),
            Self::VersionStatus {
                hid,
                number,
                status,
            } => write!(f, "version {hid}/{number} is {status}"),
            Self::PeriodSlugAbsent {
                hid,
                slug,
            } => write!(f, "period slug {slug} free on {hid}"),
            Self::PeriodRevision {
                id,
                revision,
            } => write!(f, "period {id} at revision {revision}"),
            Self::PeriodAbsent(id) => write!(f, "period {id} absent"),
            Self::PeriodVersionAbsent {
                id,
                number,
            } => write!(f, "period version {id}/{number} absent"),
            Self::PeriodVersionStatus {
                id,
                number,
                status,
            } => write!(f, "period version {id}/{number} is {status}"),
            Self::ActorAbsent(id) => write!(f, "actor {id} absent"),
        }
    }
}

/// Write applied by a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Inserts or replaces an entity.
    PutEntity(Entity),
    /// Removes an entity with its versions and periods.
    DeleteEntity(Hid),
    /// Inserts or replaces a version.
    PutVersion(Version),
    /// Inserts or replaces a period.
    PutPeriod(TimelinePeriod),
    /// Removes a period with its versions.
    DeletePeriod(PeriodId),
    /// Inserts or replaces a period version.
    PutPeriodVersion(PeriodVersion),
    /// Inserts or replaces an actor.
    PutActor(Actor),
    /// Removes an actor and every boss link pointing at it.
    DeleteActor(ActorId),
}

/// Atomic unit of preconditions and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    /// Conditions checked before any write.
    pub preconditions: Vec<Precondition>,
    /// Writes applied in order.
    pub writes: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preconditions: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Adds a precondition.
    pub fn require(&mut self, precondition: Precondition) -> &mut Self {
        self.preconditions.push(precondition);
        self
    }

    /// Adds a write.
    pub fn write(&mut self, op: WriteOp) -> &mut Self {
        self.writes.push(op);
        self
    }

    /// Returns true when the batch has no writes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

// ============================================================================
// SECTION: Store Traits
// ============================================================================

/// Read access to entities.
pub trait EntityStore {
    /// Loads an entity by HID regardless of trash state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn entity(&self, hid: &Hid) -> Result<Option<Entity>, StoreError>;

    /// Loads an entity by public ID regardless of trash state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn entity_by_public_id(&self, public_id: &PublicId) -> Result<Option<Entity>, StoreError>;

    /// Lists entities matching a query, ordered by HID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn query_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError>;
}

/// Read access to entity versions.
pub trait VersionStore {
    /// Loads a single version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn version(&self, hid: &Hid, number: u64) -> Result<Option<Version>, StoreError>;

    /// Lists every version of an entity in ascending number order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn versions(&self, hid: &Hid) -> Result<Vec<Version>, StoreError>;

    /// Lists versions matching a query, ordered by HID then number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn query_versions(&self, query: &VersionQuery) -> Result<Vec<Version>, StoreError>;
}

/// Read access to timeline periods.
pub trait PeriodStore {
    /// Loads a period by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn period(&self, id: &PeriodId) -> Result<Option<TimelinePeriod>, StoreError>;

    /// Lists the periods of an entity ordered by `(order, created_at)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn periods(&self, hid: &Hid) -> Result<Vec<TimelinePeriod>, StoreError>;

    /// Loads a single period version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn period_version(
        &self,
        id: &PeriodId,
        number: i64,
    ) -> Result<Option<PeriodVersion>, StoreError>;

    /// Lists the versions of a period in ascending number order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn period_versions(&self, id: &PeriodId) -> Result<Vec<PeriodVersion>, StoreError>;
}

/// Read access to actors.
pub trait ActorStore {
    /// Loads an actor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError>;

    /// Lists every actor ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn actors(&self) -> Result<Vec<Actor>, StoreError>;

    /// Builds a policy snapshot of every actor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn directory(&self) -> Result<ActorDirectory, StoreError> {
        Ok(ActorDirectory::new(self.actors()?))
    }
}

/// Full wiki store with atomic batch commits.
pub trait WikiStore: EntityStore + VersionStore + PeriodStore + ActorStore {
    /// Commits a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a precondition fails and other
    /// [`StoreError`] variants when persistence fails. Nothing is written on
    /// error.
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError>;
}

impl<T: EntityStore + ?Sized> EntityStore for Arc<T> {
    fn entity(&self, hid: &Hid) -> Result<Option<Entity>, StoreError> {
        (**self).entity(hid)
    }

    fn entity_by_public_id(&self, public_id: &PublicId) -> Result<Option<Entity>, StoreError> {
        (**self).entity_by_public_id(public_id)
    }

    fn query_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        (**self).query_entities(query)
    }
}

impl<T: VersionStore + ?Sized> VersionStore for Arc<T> {
    fn version(&self, hid: &Hid, number: u64) -> Result<Option<Version>, StoreError> {
        (**self).version(hid, number)
    }

    fn versions(&self, hid: &Hid) -> Result<Vec<Version>, StoreError> {
        (**self).versions(hid)
    }

    fn query_versions(&self, query: &VersionQuery) -> Result<Vec<Version>, StoreError> {
        (**self).query_versions(query)
    }
}

impl<T: PeriodStore + ?Sized> PeriodStore for Arc<T> {
    fn period(&self, id: &PeriodId) -> Result<Option<TimelinePeriod>, StoreError> {
        (**self).period(id)
    }

    fn periods(&self, hid: &Hid) -> Result<Vec<TimelinePeriod>, StoreError> {
        (**self).periods(hid)
    }

    fn period_version(
        &self,
        id: &PeriodId,
        number: i64,
    ) -> Result<Option<PeriodVersion>, StoreError> {
        (**self).period_version(id, number)
    }

    fn period_versions(&self, id: &PeriodId) -> Result<Vec<PeriodVersion>, StoreError> {
        (**self).period_versions(id)
    }
}

impl<T: ActorStore + ?Sized> ActorStore for Arc<T> {
    fn actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        (**self).actor(id)
    }

    fn actors(&self) -> Result<Vec<Actor>, StoreError> {
        (**self).actors()
    }
}

impl<T: WikiStore + ?Sized> WikiStore for Arc<T> {
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Sink I/O failure.
    #[error("audit io error: {0}")]
    Io(String),
    /// Event serialization failure.
    #[error("audit serialization error: {0}")]
    Serialization(String),
    /// Backing store failure.
    #[error("audit store error: {0}")]
    Store(String),
}

/// Append-only audit sink.
pub trait AuditSink {
    /// Records an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the event cannot be recorded.
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        (**self).record(event)
    }
}

// ============================================================================
// SECTION: Notification Sink
// ============================================================================

/// Notification sink errors.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Receiver is gone.
    #[error("notification channel closed")]
    Closed,
    /// Receiver is saturated.
    #[error("notification channel full")]
    Full,
    /// Sink I/O failure.
    #[error("notification io error: {0}")]
    Io(String),
    /// Notification serialization failure.
    #[error("notification serialization error: {0}")]
    Serialization(String),
}

/// Fire-and-forget notification sink.
pub trait NotificationSink {
    /// Emits a notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when delivery fails.
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        (**self).notify(notification)
    }
}

// ============================================================================
// SECTION: Content Oracle
// ============================================================================

/// Per-call deadlines for external content generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleDeadlines {
    /// Deadline for text generation.
    pub text: Duration,
    /// Deadline for image generation.
    pub image: Duration,
}

impl Default for OracleDeadlines {
    fn default() -> Self {
        Self {
            text: Duration::from_secs(60),
            image: Duration::from_secs(120),
        }
    }
}

/// Content oracle errors.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Call exceeded its deadline.
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    /// Oracle reported a failure.
    #[error("oracle call failed: {0}")]
    Failed(String),
}

/// Image produced by a content oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Filename assigned by the oracle's blob storage.
    pub filename: String,
}

/// External text and image generation service.
pub trait ContentOracle {
    /// Expands a description for an entity.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on failure or when `deadline` elapses.
    fn expand_description(
        &self,
        entity: &Entity,
        prompt: &str,
        deadline: Duration,
    ) -> Result<String, OracleError>;

    /// Generates a cover image for an entity.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on failure or when `deadline` elapses.
    fn generate_cover(
        &self,
        entity: &Entity,
        prompt: &str,
        deadline: Duration,
    ) -> Result<GeneratedImage, OracleError>;
}
