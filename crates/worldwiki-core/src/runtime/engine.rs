// worldwiki-core/src/runtime/engine.rs
// ============================================================================
// Module: Worldwiki Workflow Engine
// Description: Proposal, review, and publish state machine for entities.
// Purpose: Be the only path through which entity state changes.
// Dependencies: crate::{core, interfaces, runtime}, rand, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! The workflow engine turns actor intents into versioned proposals and
//! applies approved proposals to entities. Every operation follows the same
//! shape: snapshot the actor directory, authorize through the
//! [`PolicyEngine`], stage a [`WriteBatch`] with optimistic preconditions,
//! commit it atomically, then emit audit events and notifications.
//!
//! Allocations (version numbers, HIDs, public IDs) are retried when a commit
//! loses a race. Publishing is not retried: a publish whose entity or version
//! changed underneath reports [`ConflictKind::Superseded`].
//!
//! Security posture: actors that cannot view a target get
//! [`WorkflowError::NotFound`], so restricted entities are never disclosed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::core::ActorDirectory;
use crate::core::ActorId;
use crate::core::AuditAction;
use crate::core::ChangeKind;
use crate::core::ChangePayload;
use crate::core::Entity;
use crate::core::EntityStatus;
use crate::core::Hid;
use crate::core::HidError;
use crate::core::Level;
use crate::core::Metadata;
use crate::core::MetadataError;
use crate::core::NotificationKind;
use crate::core::PeriodId;
use crate::core::PublicId;
use crate::core::STRUCTURAL_NAME;
use crate::core::Timestamp;
use crate::core::Version;
use crate::core::VersionStatus;
use crate::interfaces::AuditSink;
use crate::interfaces::ContentOracle;
use crate::interfaces::EntityQuery;
use crate::interfaces::NotificationSink;
use crate::interfaces::OracleDeadlines;
use crate::interfaces::OracleError;
use crate::interfaces::Precondition;
use crate::interfaces::StoreError;
use crate::interfaces::TrashScope;
use crate::interfaces::VersionQuery;
use crate::interfaces::WikiStore;
use crate::interfaces::WriteBatch;
use crate::interfaces::WriteOp;
use crate::runtime::deep::DeepCreationService;
use crate::runtime::effects::Effects;
use crate::runtime::effects::PendingNotification;
use crate::runtime::hierarchy::HierarchyError;
use crate::runtime::hierarchy::HierarchyRepository;
use crate::runtime::hierarchy::InheritedProperty;
use crate::runtime::periods::PeriodEngine;
use crate::runtime::policy::PolicyEngine;
use crate::runtime::sinks::NoopAuditSink;
use crate::runtime::sinks::NoopNotificationSink;
use crate::runtime::tree::visible_children;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Workflow engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Commit attempts for operations that allocate identifiers.
    pub max_commit_attempts: u32,
    /// Archive older open proposals when a version is published.
    pub archive_stale_on_publish: bool,
    /// Seed for deterministic public ID generation.
    pub public_id_seed: Option<u64>,
    /// Minimum trimmed length of proposed names.
    pub min_name_length: usize,
    /// Deadlines passed to the content oracle.
    pub oracle_deadlines: OracleDeadlines,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            archive_stale_on_publish: true,
            public_id_seed: None,
            min_name_length: 1,
            oracle_deadlines: OracleDeadlines::default(),
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Per-request principal and clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Acting principal (`None` for anonymous requests).
    pub actor: Option<ActorId>,
    /// Request timestamp.
    pub at: Timestamp,
}

impl RequestContext {
    /// Creates an anonymous request context.
    #[must_use]
    pub const fn anonymous(at: Timestamp) -> Self {
        Self {
            actor: None,
            at,
        }
    }

    /// Creates a request context for an authenticated actor.
    #[must_use]
    pub fn as_actor(actor: impl Into<ActorId>, at: Timestamp) -> Self {
        Self {
            actor: Some(actor.into()),
            at,
        }
    }

    /// Returns the acting principal.
    #[must_use]
    pub const fn actor_id(&self) -> Option<&ActorId> {
        self.actor.as_ref()
    }
}

/// Request to create a child entity (or a root world when `parent` is absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRequest {
    /// Parent HID; `None` creates a level-1 world.
    pub parent: Option<Hid>,
    /// Target level; defaults to the level below the parent.
    pub level: Option<Level>,
    /// Proposed name.
    pub name: String,
    /// Proposed description.
    pub description: String,
    /// Author rationale.
    pub change_log: String,
}

impl ChildRequest {
    /// Creates a request for a direct child of `parent`.
    #[must_use]
    pub fn under(parent: Hid, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            parent: Some(parent),
            level: None,
            name: name.into(),
            description: description.into(),
            change_log: String::new(),
        }
    }

    /// Creates a request for a new root world.
    #[must_use]
    pub fn root(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            parent: None,
            level: None,
            name: name.into(),
            description: description.into(),
            change_log: String::new(),
        }
    }

    /// Returns a copy targeting a specific level.
    #[must_use]
    pub const fn at_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }
}

/// Result of a child creation proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedChild {
    /// Newly created draft entity.
    pub entity: Entity,
    /// Creation proposal (version 1, PENDING).
    pub version: Version,
    /// Structural gaps created for skipped levels.
    pub gaps: Vec<Hid>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error category used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Actor is not permitted to act on the target.
    Authorization,
    /// Identifier does not resolve for the actor.
    NotFound,
    /// Workflow preconditions are unmet.
    InvalidTransition,
    /// Payload is malformed.
    Validation,
    /// A concurrent change or duplicate key won.
    Conflict,
    /// External content generation failed.
    ExternalService,
    /// Persistence failed.
    Storage,
}

/// Unmet workflow precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Version is not APPROVED.
    #[error("version is not approved")]
    NotApproved,
    /// Version is not PENDING.
    #[error("version is not pending")]
    NotPending,
    /// Version is not REJECTED.
    #[error("version is not rejected")]
    NotRejected,
    /// Version is neither LIVE nor HISTORY.
    #[error("only live or historical versions can be restored")]
    NotRestorable,
    /// Version is HISTORY or ARCHIVED.
    #[error("version is immutable")]
    Immutable,
    /// The current period cannot be deleted.
    #[error("the current period cannot be deleted")]
    CurrentPeriodProtected,
    /// Entity is locked.
    #[error("entity is locked")]
    Locked,
    /// Entity does not accept external proposals.
    #[error("entity does not accept proposals")]
    ProposalsDisabled,
    /// Entity is not in the trash.
    #[error("entity is not in the trash")]
    NotTrashed,
    /// Entity is in the trash.
    #[error("entity is in the trash")]
    AlreadyTrashed,
    /// Entity has never been published.
    #[error("entity has not been published")]
    NotPublished,
    /// Entity has already been published.
    #[error("entity is already published")]
    AlreadyPublished,
    /// Entity still has descendants, active or trashed.
    #[error("entity still has descendants")]
    HasDescendants,
}

/// Conflict category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// HID already taken.
    DuplicateIdentifier,
    /// Public ID already taken.
    DuplicatePublicId,
    /// Period slug already taken.
    DuplicateSlug,
    /// Publish lost the race against a newer change.
    Superseded,
    /// Allocation kept losing races.
    RetryBudgetExhausted,
    /// Every identifier at the level is taken.
    IdentifierSpaceExhausted,
}

impl ConflictKind {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::DuplicatePublicId => "duplicate_public_id",
            Self::DuplicateSlug => "duplicate_slug",
            Self::Superseded => "superseded",
            Self::RetryBudgetExhausted => "retry_budget_exhausted",
            Self::IdentifierSpaceExhausted => "identifier_space_exhausted",
        }
    }
}

/// Workflow engine errors.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Actor may view the target but may not act on it.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Target does not exist or is hidden from the actor.
    #[error("not found: {0}")]
    NotFound(String),
    /// Workflow precondition unmet.
    #[error("invalid transition: {0}")]
    InvalidTransition(TransitionError),
    /// Payload is malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// Concurrent change or duplicate key.
    #[error("conflict ({}): {detail}", kind.as_str())]
    Conflict {
        /// Conflict category.
        kind: ConflictKind,
        /// Conflict details.
        detail: String,
    },
    /// External content generation failed.
    #[error("external service error: {0}")]
    ExternalService(String),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Returns the boundary category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict {
                ..
            } => ErrorKind::Conflict,
            Self::ExternalService(_) => ErrorKind::ExternalService,
            Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// Returns the transition error when this is an invalid transition.
    #[must_use]
    pub const fn transition(&self) -> Option<TransitionError> {
        match self {
            Self::InvalidTransition(transition) => Some(*transition),
            _ => None,
        }
    }

    /// Returns the conflict kind when this is a conflict.
    #[must_use]
    pub const fn conflict(&self) -> Option<ConflictKind> {
        match self {
            Self::Conflict {
                kind,
                ..
            } => Some(*kind),
            _ => None,
        }
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(error: TransitionError) -> Self {
        Self::InvalidTransition(error)
    }
}

impl From<HierarchyError> for WorkflowError {
    fn from(error: HierarchyError) -> Self {
        match error {
            HierarchyError::Hid(err) => Self::Validation(err.to_string()),
            HierarchyError::UnknownParent(hid) => Self::NotFound(format!("parent {hid}")),
            HierarchyError::DuplicateIdentifier(hid) => Self::Conflict {
                kind: ConflictKind::DuplicateIdentifier,
                detail: format!("hid {hid} already exists"),
            },
            err @ HierarchyError::Exhausted {
                ..
            } => Self::Conflict {
                kind: ConflictKind::IdentifierSpaceExhausted,
                detail: err.to_string(),
            },
            HierarchyError::Store(err) => Self::Store(err),
        }
    }
}

impl From<HidError> for WorkflowError {
    fn from(error: HidError) -> Self {
        Self::Validation(error.to_string())
    }
}

impl From<MetadataError> for WorkflowError {
    fn from(error: MetadataError) -> Self {
        Self::Validation(error.to_string())
    }
}

impl From<OracleError> for WorkflowError {
    fn from(error: OracleError) -> Self {
        Self::ExternalService(error.to_string())
    }
}

// ============================================================================
// SECTION: Internal Types
// ============================================================================

/// Staged commit produced by one attempt of an operation.
pub(crate) struct Prepared<T> {
    /// Atomic write batch.
    pub(crate) batch: WriteBatch,
    /// Value returned when the batch commits.
    pub(crate) value: T,
    /// Side effects emitted after commit.
    pub(crate) effects: Effects,
}

/// Proposal content shared by every submit intent.
#[derive(Debug, Clone)]
struct Draft {
    /// Proposed name.
    name: String,
    /// Proposed description.
    description: String,
    /// Structured change.
    payload: ChangePayload,
    /// Change category.
    kind: ChangeKind,
    /// Author rationale.
    change_log: String,
    /// Audit action recorded on submission.
    audit: AuditAction,
}

/// Review transition applied to an existing proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReviewStep {
    /// PENDING to APPROVED.
    Approve,
    /// PENDING to REJECTED.
    Reject,
    /// Open or rejected to ARCHIVED.
    Archive,
    /// REJECTED back to PENDING.
    Reopen,
}

impl ReviewStep {
    /// Status reached by the step.
    pub(crate) const fn target(self) -> VersionStatus {
        match self {
            Self::Approve => VersionStatus::Approved,
            Self::Reject => VersionStatus::Rejected,
            Self::Archive => VersionStatus::Archived,
            Self::Reopen => VersionStatus::Pending,
        }
    }

    /// Checks that `status` may take this step.
    pub(crate) const fn check(self, status: VersionStatus) -> Result<(), TransitionError> {
        if status.can_transition_to(self.target()) {
            return Ok(());
        }
        if status.is_immutable() {
            return Err(TransitionError::Immutable);
        }
        match self {
            Self::Reopen => Err(TransitionError::NotRejected),
            Self::Approve | Self::Reject | Self::Archive => Err(TransitionError::NotPending),
        }
    }

    /// Audit action recorded for the step.
    pub(crate) const fn audit_action(self) -> AuditAction {
        match self {
            Self::Approve => AuditAction::Approve,
            Self::Reject => AuditAction::Reject,
            Self::Archive => AuditAction::Archive,
            Self::Reopen => AuditAction::Restore,
        }
    }

    /// Notification sent for the step.
    pub(crate) const fn notification(self) -> NotificationKind {
        match self {
            Self::Approve => NotificationKind::ProposalApproved,
            Self::Reject => NotificationKind::ProposalRejected,
            Self::Archive => NotificationKind::ProposalArchived,
            Self::Reopen => NotificationKind::ProposalSubmitted,
        }
    }

    /// Returns true when the proposer may take the step on their own proposal.
    pub(crate) const fn allows_proposer(self) -> bool {
        matches!(self, Self::Archive | Self::Reopen)
    }
}

// ============================================================================
// SECTION: Workflow Engine
// ============================================================================

/// Proposal workflow over a wiki store.
pub struct WorkflowEngine<S, N = NoopNotificationSink, A = NoopAuditSink> {
    /// Backing store.
    store: S,
    /// Notification sink.
    notifications: N,
    /// Audit sink.
    audit: A,
    /// Engine configuration.
    config: WorkflowConfig,
    /// Generator for public and period identifiers.
    rng: Mutex<StdRng>,
}

impl<S: WikiStore> WorkflowEngine<S> {
    /// Creates an engine without side-effect sinks.
    #[must_use]
    pub fn with_store(store: S, config: WorkflowConfig) -> Self {
        Self::new(store, NoopNotificationSink, NoopAuditSink, config)
    }
}

impl<S, N, A> WorkflowEngine<S, N, A>
where
    S: WikiStore,
    N: NotificationSink,
    A: AuditSink,
{
    /// Creates a workflow engine.
    #[must_use]
    pub fn new(store: S, notifications: N, audit: A, config: WorkflowConfig) -> Self {
        let rng = config.public_id_seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            store,
            notifications,
            audit,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Returns the timeline period workflow.
    #[must_use]
    pub const fn periods(&self) -> PeriodEngine<'_, S, N, A> {
        PeriodEngine::new(self)
    }

    // ------------------------------------------------------------------------
    // Proposal intents
    // ------------------------------------------------------------------------

    /// Proposes a new name and description.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the actor may not propose or the name
    /// is invalid.
    pub fn propose_edit(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        name: impl Into<String>,
        description: impl Into<String>,
        change_log: impl Into<String>,
    ) -> Result<Version, WorkflowError> {
        let draft = Draft {
            name: name.into(),
            description: description.into(),
            payload: ChangePayload::Edit {
                metadata: None,
            },
            kind: ChangeKind::Live,
            change_log: change_log.into(),
            audit: AuditAction::Create,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Proposes replacement metadata given in any accepted shape.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Validation`] when the metadata is malformed.
    pub fn propose_metadata(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        metadata: &Value,
        change_log: impl Into<String>,
    ) -> Result<Version, WorkflowError> {
        let metadata = Metadata::normalize(metadata)?;
        let entity = self.current(hid)?;
        let draft = Draft {
            name: entity.name,
            description: entity.description,
            payload: ChangePayload::Edit {
                metadata: Some(metadata),
            },
            kind: ChangeKind::Metadata,
            change_log: change_log.into(),
            audit: AuditAction::ProposeMetadata,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Proposes a new cover image filename.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Validation`] when the filename is empty.
    pub fn propose_cover(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        cover_image: impl Into<String>,
        change_log: impl Into<String>,
    ) -> Result<Version, WorkflowError> {
        self.submit_cover(ctx, hid, cover_image.into(), change_log.into(), AuditAction::SetCover)
    }

    /// Proposes a public visibility change.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the actor may not propose.
    pub fn propose_visibility(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        target_visibility: bool,
        change_log: impl Into<String>,
    ) -> Result<Version, WorkflowError> {
        let entity = self.current(hid)?;
        let draft = Draft {
            name: entity.name,
            description: entity.description,
            payload: ChangePayload::ToggleVisibility {
                target_visibility,
            },
            kind: ChangeKind::Live,
            change_log: change_log.into(),
            audit: AuditAction::ToggleVisibility,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Proposes soft deletion.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the actor may not propose or the entity
    /// is already trashed.
    pub fn propose_delete(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        change_log: impl Into<String>,
    ) -> Result<Version, WorkflowError> {
        let entity = self.current(hid)?;
        let draft = Draft {
            name: entity.name,
            description: entity.description,
            payload: ChangePayload::Delete,
            kind: ChangeKind::Live,
            change_log: change_log.into(),
            audit: AuditAction::Delete,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Proposes restoring a trashed entity.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotTrashed`] when the entity is active.
    pub fn propose_restore(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        change_log: impl Into<String>,
    ) -> Result<Version, WorkflowError> {
        let entity = self.current(hid)?;
        let draft = Draft {
            name: entity.name,
            description: entity.description,
            payload: ChangePayload::Restore,
            kind: ChangeKind::Live,
            change_log: change_log.into(),
            audit: AuditAction::Restore,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Proposes a child entity, synthesizing structural gaps for skipped
    /// levels, or a new root world when no parent is given.
    ///
    /// The child is created as a draft with a PENDING version 1 in the same
    /// commit as any gaps.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the actor may not propose against the
    /// parent, the level is not deeper than the parent, or allocation fails.
    pub fn propose_child(
        &self,
        ctx: &RequestContext,
        request: &ChildRequest,
    ) -> Result<CreatedChild, WorkflowError> {
        self.validate_name(&request.name)?;
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        let repository = HierarchyRepository::new(&self.store);
        let deep = DeepCreationService::new(&self.store);
        self.run(
            "propose_child",
            self.config.max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let mut batch = WriteBatch::new();
                let (hid, author, gaps) = if let Some(parent_hid) = &request.parent {
                    let parent = self.load_entity(&policy, actor, parent_hid, TrashScope::Active)?;
                    if !parent.is_published() {
                        return Err(TransitionError::NotPublished.into());
                    }
                    ensure_can_propose(&policy, actor, &parent)?;
                    let level = match request.level {
                        Some(level) => level,
                        None => parent.hid.level().next().ok_or(HidError::TargetNotDeeper {
                            parent: parent.hid.level().get(),
                            target: parent.hid.level().get(),
                        })?,
                    };
                    let plan = deep.plan(&parent.hid, level)?;
                    let hid = repository.next_child_id(&parent.hid, Some(level))?;
                    self.with_rng(|rng| {
                        deep.append_gaps(&plan, parent.author.as_ref(), &mut batch, rng, ctx.at);
                    })?;
                    (hid, parent.author, plan.missing)
                } else {
                    if !policy.can_create_root(actor) {
                        return Err(WorkflowError::Forbidden(
                            "actor may not create root worlds".to_string(),
                        ));
                    }
                    if request.level.is_some_and(|level| level != Level::ROOT) {
                        return Err(WorkflowError::Validation(
                            "root worlds live at level 1".to_string(),
                        ));
                    }
                    (repository.next_root_id()?, actor.cloned(), Vec::new())
                };
                let public_id = self.public_id()?;
                let mut entity = Entity::draft(
                    hid.clone(),
                    public_id,
                    request.name.clone(),
                    request.description.clone(),
                    author,
                    ctx.at,
                );
                entity.visibility_public = true;
                let version = Version {
                    hid: hid.clone(),
                    version_number: 1,
                    created_at: ctx.at,
                    reviewed_at: None,
                    proposed_name: request.name.clone(),
                    proposed_description: request.description.clone(),
                    payload: ChangePayload::Add {
                        level: hid.level(),
                        parent: request.parent.clone(),
                    },
                    kind: ChangeKind::Live,
                    status: VersionStatus::Pending,
                    change_log: request.change_log.clone(),
                    author: actor.cloned(),
                    reviewer: None,
                    admin_feedback: None,
                };
                batch
                    .require(Precondition::EntityAbsent(hid.clone()))
                    .require(Precondition::PublicIdAbsent(entity.public_id.clone()))
                    .write(WriteOp::PutEntity(entity.clone()))
                    .write(WriteOp::PutVersion(version.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    AuditAction::Create,
                    hid.to_string(),
                    json!({
                        "version_number": 1,
                        "action": "ADD",
                        "parent": request.parent.as_ref().map(Hid::as_str),
                        "gaps": gaps.iter().map(Hid::as_str).collect::<Vec<_>>(),
                    }),
                    ctx.at,
                );
                effects.notify(
                    entity.author.as_ref(),
                    actor,
                    PendingNotification::new(
                        NotificationKind::ProposalSubmitted,
                        hid.to_string(),
                        Some(1),
                        format!("new child proposed: {}", request.name),
                        ctx.at,
                    ),
                );
                Ok(Prepared {
                    batch,
                    value: CreatedChild {
                        entity,
                        version,
                        gaps,
                    },
                    effects,
                })
            },
        )
    }

    /// Creates a new proposal prefilled from a REJECTED one.
    ///
    /// `name` and `description` override the rejected values when given; the
    /// rejected version is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRejected`] when the source is not
    /// REJECTED.
    pub fn retouch(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        source: u64,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Version, WorkflowError> {
        let rejected = self.version_record(hid, source)?;
        if rejected.status != VersionStatus::Rejected {
            return Err(TransitionError::NotRejected.into());
        }
        let draft = Draft {
            name: name.unwrap_or_else(|| rejected.proposed_name.clone()),
            description: description.unwrap_or_else(|| rejected.proposed_description.clone()),
            audit: proposal_audit_action(&rejected.payload),
            payload: rejected.payload,
            kind: rejected.kind,
            change_log: format!("retouch of version {source}"),
        };
        self.submit(ctx, hid, &draft)
    }

    /// Creates a new EDIT proposal restoring a LIVE or HISTORY snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRestorable`] when the source is neither
    /// LIVE nor HISTORY.
    pub fn revert_to(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        source: u64,
    ) -> Result<Version, WorkflowError> {
        let snapshot = self.version_record(hid, source)?;
        if !matches!(snapshot.status, VersionStatus::History | VersionStatus::Live) {
            return Err(TransitionError::NotRestorable.into());
        }
        let payload = match snapshot.payload {
            ChangePayload::Add {
                ..
            }
            | ChangePayload::Delete
            | ChangePayload::Restore => ChangePayload::Edit {
                metadata: None,
            },
            other => other,
        };
        let draft = Draft {
            name: snapshot.proposed_name,
            description: snapshot.proposed_description,
            payload,
            kind: ChangeKind::Live,
            change_log: format!("restore of version {source}"),
            audit: AuditAction::Restore,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Asks the content oracle for an expanded description and proposes it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ExternalService`] when the oracle fails or
    /// times out; nothing is written in that case.
    pub fn propose_expanded_description<O: ContentOracle + ?Sized>(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        oracle: &O,
        prompt: &str,
    ) -> Result<Version, WorkflowError> {
        let entity = self.authorize_proposal(ctx, hid)?;
        let description =
            oracle.expand_description(&entity, prompt, self.config.oracle_deadlines.text)?;
        let draft = Draft {
            name: entity.name,
            description,
            payload: ChangePayload::Edit {
                metadata: None,
            },
            kind: ChangeKind::Live,
            change_log: "generated description".to_string(),
            audit: AuditAction::Create,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Asks the content oracle for a cover image and proposes it.
    ///
    /// The upload is audited as soon as the oracle returns, even when the
    /// proposal itself then fails.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ExternalService`] when the oracle fails or
    /// times out; nothing is written in that case.
    pub fn propose_generated_cover<O: ContentOracle + ?Sized>(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        oracle: &O,
        prompt: &str,
    ) -> Result<Version, WorkflowError> {
        let entity = self.authorize_proposal(ctx, hid)?;
        let image = oracle.generate_cover(&entity, prompt, self.config.oracle_deadlines.image)?;
        let mut upload = Effects::new();
        upload.audit(
            ctx.actor_id(),
            AuditAction::UploadPhoto,
            hid.to_string(),
            json!({ "filename": image.filename }),
            ctx.at,
        );
        upload.emit(&self.audit, &self.notifications);
        self.submit_cover(
            ctx,
            hid,
            image.filename,
            "generated cover".to_string(),
            AuditAction::ProposeCover,
        )
    }

    // ------------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------------

    /// Approves a PENDING proposal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPending`] for non-pending versions and
    /// [`WorkflowError::Forbidden`] when the actor may not approve.
    pub fn approve(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        number: u64,
        feedback: Option<String>,
    ) -> Result<Version, WorkflowError> {
        self.review(ctx, hid, number, ReviewStep::Approve, feedback)
    }

    /// Rejects a PENDING proposal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPending`] for non-pending versions and
    /// [`WorkflowError::Forbidden`] when the actor may not review.
    pub fn reject(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        number: u64,
        feedback: Option<String>,
    ) -> Result<Version, WorkflowError> {
        self.review(ctx, hid, number, ReviewStep::Reject, feedback)
    }

    /// Archives a PENDING, APPROVED, or REJECTED proposal.
    ///
    /// Reviewers may archive any such proposal; authors may withdraw their
    /// own.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the version cannot be archived by the
    /// actor.
    pub fn archive(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        number: u64,
        reason: Option<String>,
    ) -> Result<Version, WorkflowError> {
        self.review(ctx, hid, number, ReviewStep::Archive, reason)
    }

    /// Moves a REJECTED proposal back to PENDING.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRejected`] when the version is not
    /// REJECTED.
    pub fn restore_rejected(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        number: u64,
    ) -> Result<Version, WorkflowError> {
        self.review(ctx, hid, number, ReviewStep::Reopen, None)
    }

    /// Publishes an APPROVED proposal, superseding the current LIVE version.
    ///
    /// A superuser may publish a PENDING proposal directly; it is approved and
    /// published in one commit and both steps are audited.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotApproved`] when the version is not
    /// approved, [`WorkflowError::Forbidden`] when the actor may not publish,
    /// and [`ConflictKind::Superseded`] when a newer change won.
    pub fn publish(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        number: u64,
    ) -> Result<Version, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        self.run("publish", 1, ConflictKind::Superseded, || {
            let entity = self.load_entity(&policy, actor, hid, TrashScope::Any)?;
            let original = self.version_record(hid, number)?;
            if !policy.can_publish(actor, &entity) {
                return Err(WorkflowError::Forbidden(format!("actor may not publish {hid}")));
            }
            let auto_approve =
                original.status == VersionStatus::Pending && policy.is_superuser(actor);
            if original.status != VersionStatus::Approved && !auto_approve {
                return Err(if original.status.is_immutable() {
                    TransitionError::Immutable
                } else {
                    TransitionError::NotApproved
                }
                .into());
            }
            if number < entity.current_version_number {
                return Err(WorkflowError::Conflict {
                    kind: ConflictKind::Superseded,
                    detail: format!(
                        "version {number} is older than live version {}",
                        entity.current_version_number
                    ),
                });
            }
            let mut published = original.clone();
            if auto_approve || published.reviewer.is_none() {
                published.reviewer = actor.cloned();
                published.reviewed_at = Some(ctx.at);
            }
            published.status = VersionStatus::Live;

            let mut updated = entity.clone();
            apply_payload(&mut updated, &published, ctx.at);

            let mut batch = WriteBatch::new();
            batch
                .require(Precondition::EntityRevision {
                    hid: hid.clone(),
                    revision: entity.revision,
                })
                .require(Precondition::VersionStatus {
                    hid: hid.clone(),
                    number,
                    status: original.status,
                });
            let mut effects = Effects::new();
            let mut superseded = None;
            let mut archived = Vec::new();
            for mut other in self.store.versions(hid)? {
                if other.version_number == number {
                    continue;
                }
                let next = if other.status == VersionStatus::Live {
                    superseded = Some(other.version_number);
                    VersionStatus::History
                } else if self.config.archive_stale_on_publish
                    && other.status.is_open()
                    && other.version_number < number
                {
                    archived.push(other.version_number);
                    effects.notify(
                        other.author.as_ref(),
                        actor,
                        PendingNotification::new(
                            NotificationKind::ProposalArchived,
                            hid.to_string(),
                            version_label(other.version_number),
                            format!("proposal superseded by version {number}"),
                            ctx.at,
                        ),
                    );
                    VersionStatus::Archived
                } else {
                    continue;
                };
                batch.require(Precondition::VersionStatus {
                    hid: hid.clone(),
                    number: other.version_number,
                    status: other.status,
                });
                other.status = next;
                batch.write(WriteOp::PutVersion(other));
            }
            batch
                .write(WriteOp::PutVersion(published.clone()))
                .write(WriteOp::PutEntity(updated));

            if auto_approve {
                effects.audit(
                    actor,
                    AuditAction::Approve,
                    hid.to_string(),
                    json!({ "version_number": number, "auto": true }),
                    ctx.at,
                );
            }
            effects.audit(
                actor,
                AuditAction::Publish,
                hid.to_string(),
                json!({
                    "version_number": number,
                    "action": published.action().as_str(),
                    "superseded": superseded,
                    "archived": archived,
                }),
                ctx.at,
            );
            effects.notify(
                published.author.as_ref(),
                actor,
                PendingNotification::new(
                    NotificationKind::ProposalPublished,
                    hid.to_string(),
                    version_label(number),
                    format!("version {number} is live"),
                    ctx.at,
                ),
            );
            Ok(Prepared {
                batch,
                value: published,
                effects,
            })
        })
    }

    // ------------------------------------------------------------------------
    // Owner controls
    // ------------------------------------------------------------------------

    /// Locks or unlocks a published entity.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] unless the actor owns the entity
    /// or is a superuser.
    pub fn set_lock(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        locked: bool,
    ) -> Result<Entity, WorkflowError> {
        self.owner_update(ctx, hid, AuditAction::ToggleLock, |entity| {
            if !entity.status.is_published_state() {
                return Err(TransitionError::NotPublished.into());
            }
            entity.status = if locked { EntityStatus::Locked } else { EntityStatus::Live };
            Ok(())
        })
    }

    /// Enables or disables external proposals.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] unless the actor owns the entity
    /// or is a superuser.
    pub fn set_allow_proposals(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        allow: bool,
    ) -> Result<Entity, WorkflowError> {
        self.owner_update(ctx, hid, AuditAction::ToggleProposals, |entity| {
            entity.allow_proposals = allow;
            Ok(())
        })
    }

    /// Permanently removes a trashed entity with its versions and periods.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotTrashed`] when the entity is active and
    /// [`TransitionError::HasDescendants`] while any node below it remains.
    pub fn hard_delete(&self, ctx: &RequestContext, hid: &Hid) -> Result<(), WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        self.run("hard_delete", 1, ConflictKind::Superseded, || {
            let entity = self.load_entity(&policy, actor, hid, TrashScope::Any)?;
            if entity.is_active {
                return Err(TransitionError::NotTrashed.into());
            }
            let subtree = self.store.query_entities(
                &EntityQuery::active().with_prefix(hid.clone()).with_scope(TrashScope::Any),
            )?;
            if subtree.iter().any(|node| node.hid != *hid) {
                return Err(TransitionError::HasDescendants.into());
            }
            let mut batch = WriteBatch::new();
            batch
                .require(Precondition::EntityRevision {
                    hid: hid.clone(),
                    revision: entity.revision,
                })
                .write(WriteOp::DeleteEntity(hid.clone()));
            let mut effects = Effects::new();
            effects.audit(
                actor,
                AuditAction::Delete,
                hid.to_string(),
                json!({ "hard": true, "public_id": entity.public_id.as_str() }),
                ctx.at,
            );
            Ok(Prepared {
                batch,
                value: (),
                effects,
            })
        })
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Loads an active entity visible to the actor.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is missing, trashed,
    /// or hidden.
    pub fn get_entity(&self, ctx: &RequestContext, hid: &Hid) -> Result<Entity, WorkflowError> {
        let directory = self.snapshot()?;
        self.load_entity(&PolicyEngine::new(&directory), ctx.actor_id(), hid, TrashScope::Active)
    }

    /// Loads an active entity by public ID.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is missing, trashed,
    /// or hidden.
    pub fn get_by_public_id(
        &self,
        ctx: &RequestContext,
        public_id: &PublicId,
    ) -> Result<Entity, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        HierarchyRepository::new(&self.store)
            .get_by_public_id(public_id)?
            .filter(|entity| policy.can_view(ctx.actor_id(), entity))
            .ok_or_else(|| WorkflowError::NotFound(format!("entity {public_id}")))
    }

    /// Lists active entities visible to the actor.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] when the query fails.
    pub fn list(
        &self,
        ctx: &RequestContext,
        prefix: Option<&Hid>,
        length: Option<usize>,
    ) -> Result<Vec<Entity>, WorkflowError> {
        let directory = self.snapshot()?;
        let mut query = EntityQuery::active()
            .with_filter(PolicyEngine::new(&directory).visibility_filter(ctx.actor_id()));
        query.prefix = prefix.cloned();
        query.length = length;
        Ok(self.store.query_entities(&query)?)
    }

    /// Returns the children to display below an entity, hoisting real
    /// descendants past empty structural gaps.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the parent is not visible.
    pub fn children(&self, ctx: &RequestContext, hid: &Hid) -> Result<Vec<Entity>, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let parent = self.load_entity(&policy, ctx.actor_id(), hid, TrashScope::Active)?;
        let query = EntityQuery::active()
            .with_prefix(parent.hid.clone())
            .with_filter(policy.visibility_filter(ctx.actor_id()));
        let descendants = self.store.query_entities(&query)?;
        Ok(visible_children(&parent.hid, &descendants).into_iter().cloned().collect())
    }

    /// Returns the visible ancestors of an entity, root first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is not visible.
    pub fn ancestors(&self, ctx: &RequestContext, hid: &Hid) -> Result<Vec<Entity>, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        self.load_entity(&policy, ctx.actor_id(), hid, TrashScope::Active)?;
        let mut chain = HierarchyRepository::new(&self.store).ancestors(hid)?;
        chain.retain(|entity| policy.can_view(ctx.actor_id(), entity));
        Ok(chain)
    }

    /// Returns local and inherited metadata properties of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is not visible.
    pub fn inherited_properties(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
    ) -> Result<Vec<InheritedProperty>, WorkflowError> {
        let directory = self.snapshot()?;
        self.load_entity(&PolicyEngine::new(&directory), ctx.actor_id(), hid, TrashScope::Active)?;
        Ok(HierarchyRepository::new(&self.store).inherited_properties(hid)?)
    }

    /// Lists every version of an entity visible to the actor.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is not visible.
    pub fn versions(&self, ctx: &RequestContext, hid: &Hid) -> Result<Vec<Version>, WorkflowError> {
        let directory = self.snapshot()?;
        self.load_entity(&PolicyEngine::new(&directory), ctx.actor_id(), hid, TrashScope::Any)?;
        Ok(self.store.versions(hid)?)
    }

    /// Lists proposals inside the actor's review silo.
    ///
    /// An empty status list selects every status.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] for anonymous or unknown actors.
    pub fn dashboard(
        &self,
        ctx: &RequestContext,
        statuses: &[VersionStatus],
    ) -> Result<Vec<Version>, WorkflowError> {
        let directory = self.snapshot()?;
        let actor = ctx
            .actor_id()
            .filter(|actor| directory.get(actor).is_some())
            .ok_or_else(|| WorkflowError::Forbidden("dashboard requires an actor".to_string()))?;
        let query = VersionQuery {
            hid: None,
            statuses: statuses.to_vec(),
            filter: PolicyEngine::new(&directory).proposal_filter(actor),
        };
        Ok(self.store.query_versions(&query)?)
    }

    /// Lists trashed entities the actor may manage.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] when the query fails.
    pub fn trash(&self, ctx: &RequestContext) -> Result<Vec<Entity>, WorkflowError> {
        let directory = self.snapshot()?;
        let Some(filter) = PolicyEngine::new(&directory).trash_filter(ctx.actor_id()) else {
            return Ok(Vec::new());
        };
        let query = EntityQuery::active().with_scope(TrashScope::Trashed).with_filter(filter);
        Ok(self.store.query_entities(&query)?)
    }

    // ------------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------------

    /// Loads the actor directory snapshot.
    pub(crate) fn snapshot(&self) -> Result<ActorDirectory, WorkflowError> {
        Ok(self.store.directory()?)
    }

    /// Runs a closure against the identifier generator.
    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T, WorkflowError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| StoreError::Store("identifier generator mutex poisoned".to_string()))?;
        Ok(f(&mut rng))
    }

    /// Generates a fresh public ID.
    fn public_id(&self) -> Result<PublicId, WorkflowError> {
        self.with_rng(|rng| PublicId::generate(rng))
    }

    /// Generates a fresh period ID.
    pub(crate) fn period_id(&self) -> Result<PeriodId, WorkflowError> {
        self.with_rng(|rng| PeriodId::generate(rng))
    }

    /// Emits staged effects through the configured sinks.
    pub(crate) fn emit(&self, effects: Effects) {
        effects.emit(&self.audit, &self.notifications);
    }

    /// Commits the batch produced by `prepare`, re-preparing after lost races.
    ///
    /// `prepare` re-reads state on every attempt. After `attempts` lost races
    /// the operation fails with a conflict of kind `exhausted`.
    pub(crate) fn run<T>(
        &self,
        operation: &'static str,
        attempts: u32,
        exhausted: ConflictKind,
        mut prepare: impl FnMut() -> Result<Prepared<T>, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let attempts = attempts.max(1);
        let mut last_conflict = String::new();
        for attempt in 1..=attempts {
            let prepared = prepare()?;
            if prepared.batch.is_empty() {
                self.emit(prepared.effects);
                return Ok(prepared.value);
            }
            match self.store.commit(&prepared.batch) {
                Ok(()) => {
                    self.emit(prepared.effects);
                    return Ok(prepared.value);
                }
                Err(StoreError::Conflict(detail)) => {
                    debug!(operation, attempt, attempts, detail = %detail, "commit conflict");
                    last_conflict = detail;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(WorkflowError::Conflict {
            kind: exhausted,
            detail: format!("{operation}: {last_conflict}"),
        })
    }

    /// Loads an entity and applies the read gate.
    ///
    /// Trashed entities are only returned for [`TrashScope::Any`] and only to
    /// actors who may manage them.
    pub(crate) fn load_entity(
        &self,
        policy: &PolicyEngine<'_>,
        actor: Option<&ActorId>,
        hid: &Hid,
        scope: TrashScope,
    ) -> Result<Entity, WorkflowError> {
        let not_found = || WorkflowError::NotFound(format!("entity {hid}"));
        let entity = self.store.entity(hid)?.ok_or_else(not_found)?;
        let reachable = if entity.is_active {
            scope != TrashScope::Trashed && policy.can_view(actor, &entity)
        } else {
            scope != TrashScope::Active && policy.can_publish(actor, &entity)
        };
        if reachable { Ok(entity) } else { Err(not_found()) }
    }

    /// Rejects names shorter than the configured minimum.
    pub(crate) fn validate_name(&self, name: &str) -> Result<(), WorkflowError> {
        if name.trim().chars().count() < self.config.min_name_length {
            return Err(WorkflowError::Validation(format!(
                "name must have at least {} characters",
                self.config.min_name_length
            )));
        }
        Ok(())
    }

    /// Loads an entity without applying the read gate.
    fn current(&self, hid: &Hid) -> Result<Entity, WorkflowError> {
        self.store.entity(hid)?.ok_or_else(|| WorkflowError::NotFound(format!("entity {hid}")))
    }

    /// Loads a version without applying the read gate.
    fn version_record(&self, hid: &Hid, number: u64) -> Result<Version, WorkflowError> {
        self.store
            .version(hid, number)?
            .ok_or_else(|| WorkflowError::NotFound(format!("version {hid}/{number}")))
    }

    /// Checks that the actor may submit an edit against the entity.
    fn authorize_proposal(&self, ctx: &RequestContext, hid: &Hid) -> Result<Entity, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let entity = self.load_entity(&policy, ctx.actor_id(), hid, TrashScope::Active)?;
        check_submission(
            &entity,
            &ChangePayload::Edit {
                metadata: None,
            },
        )?;
        ensure_can_propose(&policy, ctx.actor_id(), &entity)?;
        Ok(entity)
    }

    /// Submits a cover proposal.
    fn submit_cover(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        cover_image: String,
        change_log: String,
        audit: AuditAction,
    ) -> Result<Version, WorkflowError> {
        if cover_image.trim().is_empty() {
            return Err(WorkflowError::Validation("cover image filename is empty".to_string()));
        }
        let entity = self.current(hid)?;
        let draft = Draft {
            name: entity.name,
            description: entity.description,
            payload: ChangePayload::SetCover {
                cover_image,
            },
            kind: ChangeKind::Metadata,
            change_log,
            audit,
        };
        self.submit(ctx, hid, &draft)
    }

    /// Appends a PENDING proposal to an entity.
    fn submit(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        draft: &Draft,
    ) -> Result<Version, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        self.run(
            "submit",
            self.config.max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let entity = self.load_entity(&policy, actor, hid, TrashScope::Any)?;
                check_submission(&entity, &draft.payload)?;
                ensure_can_propose(&policy, actor, &entity)?;
                if draft.kind == ChangeKind::Live {
                    self.validate_name(&draft.name)?;
                }
                let versions = self.store.versions(hid)?;
                let number = versions
                    .iter()
                    .map(|version| version.version_number)
                    .max()
                    .unwrap_or(0)
                    .saturating_add(1);
                let created_at = versions
                    .iter()
                    .map(|version| version.created_at)
                    .max()
                    .map_or(ctx.at, |floor| ctx.at.at_least(floor));
                let version = Version {
                    hid: hid.clone(),
                    version_number: number,
                    created_at,
                    reviewed_at: None,
                    proposed_name: draft.name.clone(),
                    proposed_description: draft.description.clone(),
                    payload: draft.payload.clone(),
                    kind: draft.kind,
                    status: VersionStatus::Pending,
                    change_log: draft.change_log.clone(),
                    author: actor.cloned(),
                    reviewer: None,
                    admin_feedback: None,
                };
                let mut batch = WriteBatch::new();
                batch
                    .require(Precondition::VersionAbsent {
                        hid: hid.clone(),
                        number,
                    })
                    .write(WriteOp::PutVersion(version.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    draft.audit,
                    hid.to_string(),
                    json!({
                        "version_number": number,
                        "action": version.action().as_str(),
                    }),
                    ctx.at,
                );
                effects.notify(
                    entity.author.as_ref(),
                    actor,
                    PendingNotification::new(
                        NotificationKind::ProposalSubmitted,
                        hid.to_string(),
                        version_label(number),
                        format!("new {} proposal on {}", version.action(), entity.name),
                        ctx.at,
                    ),
                );
                Ok(Prepared {
                    batch,
                    value: version,
                    effects,
                })
            },
        )
    }

    /// Applies a review step to an entity version.
    fn review(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        number: u64,
        step: ReviewStep,
        feedback: Option<String>,
    ) -> Result<Version, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        self.run(
            "review",
            self.config.max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let entity = self.load_entity(&policy, actor, hid, TrashScope::Any)?;
                let original = self.version_record(hid, number)?;
                step.check(original.status)?;
                let own = actor.is_some() && original.author.as_ref() == actor;
                let permitted = policy.can_approve(actor, &original, &entity)
                    || (own && step.allows_proposer());
                if !permitted {
                    return Err(WorkflowError::Forbidden(format!(
                        "actor may not review {hid}/{number}"
                    )));
                }
                let mut reviewed = original.clone();
                reviewed.status = step.target();
                if step == ReviewStep::Reopen {
                    reviewed.reviewer = None;
                    reviewed.reviewed_at = None;
                    reviewed.admin_feedback = None;
                } else {
                    if !own {
                        reviewed.reviewer = actor.cloned();
                    }
                    reviewed.reviewed_at = Some(ctx.at);
                    if feedback.is_some() {
                        reviewed.admin_feedback.clone_from(&feedback);
                    }
                }
                let mut batch = WriteBatch::new();
                batch
                    .require(Precondition::VersionStatus {
                        hid: hid.clone(),
                        number,
                        status: original.status,
                    })
                    .write(WriteOp::PutVersion(reviewed.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    step.audit_action(),
                    hid.to_string(),
                    json!({
                        "version_number": number,
                        "from": original.status.as_str(),
                        "to": reviewed.status.as_str(),
                        "feedback": feedback,
                    }),
                    ctx.at,
                );
                let recipient = if step == ReviewStep::Reopen {
                    entity.author.as_ref()
                } else {
                    reviewed.author.as_ref()
                };
                effects.notify(
                    recipient,
                    actor,
                    PendingNotification::new(
                        step.notification(),
                        hid.to_string(),
                        version_label(number),
                        format!("version {number} is now {}", reviewed.status),
                        ctx.at,
                    ),
                );
                Ok(Prepared {
                    batch,
                    value: reviewed,
                    effects,
                })
            },
        )
    }

    /// Applies a direct owner change to an active entity.
    fn owner_update(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        action: AuditAction,
        change: impl Fn(&mut Entity) -> Result<(), WorkflowError>,
    ) -> Result<Entity, WorkflowError> {
        let directory = self.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        self.run(
            action.as_str(),
            self.config.max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let entity = self.load_entity(&policy, actor, hid, TrashScope::Active)?;
                if !policy.can_publish(actor, &entity) {
                    return Err(WorkflowError::Forbidden(format!("actor may not manage {hid}")));
                }
                let mut updated = entity.clone();
                change(&mut updated)?;
                if updated == entity {
                    return Ok(Prepared {
                        batch: WriteBatch::new(),
                        value: entity,
                        effects: Effects::new(),
                    });
                }
                updated.revision = entity.revision.saturating_add(1);
                updated.updated_at = ctx.at;
                let mut batch = WriteBatch::new();
                batch
                    .require(Precondition::EntityRevision {
                        hid: hid.clone(),
                        revision: entity.revision,
                    })
                    .write(WriteOp::PutEntity(updated.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    action,
                    hid.to_string(),
                    json!({
                        "status": updated.status.as_str(),
                        "allow_proposals": updated.allow_proposals,
                    }),
                    ctx.at,
                );
                Ok(Prepared {
                    batch,
                    value: updated,
                    effects,
                })
            },
        )
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails unless the actor may propose against the entity.
///
/// Collaborators blocked only by a lock or the proposal toggle get an invalid
/// transition; everyone else is forbidden.
pub(crate) fn ensure_can_propose(
    policy: &PolicyEngine<'_>,
    actor: Option<&ActorId>,
    entity: &Entity,
) -> Result<(), WorkflowError> {
    if policy.can_propose(actor, entity) {
        return Ok(());
    }
    if policy.is_collaborator(actor, entity) {
        let blocked = if entity.status == EntityStatus::Locked {
            TransitionError::Locked
        } else {
            TransitionError::ProposalsDisabled
        };
        return Err(blocked.into());
    }
    Err(WorkflowError::Forbidden(format!("actor may not propose against {}", entity.hid)))
}

/// Checks the entity lifecycle against a proposal payload.
fn check_submission(entity: &Entity, payload: &ChangePayload) -> Result<(), TransitionError> {
    match payload {
        ChangePayload::Restore if entity.is_active => Err(TransitionError::NotTrashed),
        ChangePayload::Restore => Ok(()),
        _ if !entity.is_active => Err(TransitionError::AlreadyTrashed),
        ChangePayload::Add {
            ..
        } if entity.is_published() => Err(TransitionError::AlreadyPublished),
        ChangePayload::Add {
            ..
        } => Ok(()),
        _ if !entity.is_published() => Err(TransitionError::NotPublished),
        _ => Ok(()),
    }
}

/// Audit action recorded when a proposal with `payload` is submitted.
const fn proposal_audit_action(payload: &ChangePayload) -> AuditAction {
    match payload {
        ChangePayload::Add {
            ..
        }
        | ChangePayload::Edit {
            metadata: None,
        } => AuditAction::Create,
        ChangePayload::Edit {
            metadata: Some(_),
        } => AuditAction::ProposeMetadata,
        ChangePayload::Delete => AuditAction::Delete,
        ChangePayload::Restore => AuditAction::Restore,
        ChangePayload::SetCover {
            ..
        } => AuditAction::SetCover,
        ChangePayload::ToggleVisibility {
            ..
        } => AuditAction::ToggleVisibility,
    }
}

/// Applies a published version to its entity.
fn apply_payload(entity: &mut Entity, version: &Version, at: Timestamp) {
    match &version.payload {
        ChangePayload::Add {
            ..
        } => apply_text(entity, version),
        ChangePayload::Edit {
            metadata,
        } => {
            if version.kind == ChangeKind::Live {
                apply_text(entity, version);
            }
            if let Some(metadata) = metadata {
                entity.metadata.replace_properties(metadata.properties.clone());
                if metadata.cover_image.is_some() {
                    entity.metadata.cover_image.clone_from(&metadata.cover_image);
                }
            }
        }
        ChangePayload::Delete => {
            entity.is_active = false;
            entity.deleted_at = Some(at);
            entity.status_before_delete = Some(entity.status);
            entity.status = EntityStatus::Deleted;
        }
        ChangePayload::Restore => {
            entity.is_active = true;
            entity.deleted_at = None;
            entity.status = match entity.status_before_delete.take() {
                Some(EntityStatus::Locked) => EntityStatus::Locked,
                _ => EntityStatus::Live,
            };
        }
        ChangePayload::SetCover {
            cover_image,
        } => entity.metadata.cover_image = Some(cover_image.clone()),
        ChangePayload::ToggleVisibility {
            target_visibility,
        } => entity.visibility_public = *target_visibility,
    }
    if entity.status == EntityStatus::Draft {
        entity.status = EntityStatus::Live;
    }
    entity.current_version_number = version.version_number;
    entity.revision = entity.revision.saturating_add(1);
    entity.updated_at = at;
}

/// Overwrites name and description; a renamed gap becomes a real node.
fn apply_text(entity: &mut Entity, version: &Version) {
    entity.name.clone_from(&version.proposed_name);
    entity.description.clone_from(&version.proposed_description);
    if entity.is_gap() && entity.name != STRUCTURAL_NAME {
        entity.metadata.node_kind = None;
    }
}

/// Converts an entity version number into a notification label.
fn version_label(number: u64) -> Option<i64> {
    i64::try_from(number).ok()
}
