// worldwiki-core/src/runtime/periods.rs
// ============================================================================
// Module: Worldwiki Period Engine
// Description: Proposal workflow and current-slot rotation for timeline periods.
// Purpose: Mirror the entity workflow for periods with their own version chain.
// Dependencies: crate::{core, interfaces, runtime}, serde_json
// ============================================================================

//! ## Overview
//! Periods are created directly with a seed version numbered `-1` in the
//! APPROVED state, so the first user proposal is version `0`. Edits and
//! deletions then follow the same review machine as entity versions. The
//! current period can never be deleted, and activation rotates the current
//! slot in a single commit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::core::Action;
use crate::core::ActorId;
use crate::core::AuditAction;
use crate::core::Entity;
use crate::core::Hid;
use crate::core::Metadata;
use crate::core::NotificationKind;
use crate::core::PeriodId;
use crate::core::PeriodVersion;
use crate::core::TimelinePeriod;
use crate::core::VersionStatus;
use crate::core::period::SEED_VERSION_NUMBER;
use crate::core::period::unique_slug;
use crate::core::slugify;
use crate::interfaces::AuditSink;
use crate::interfaces::NotificationSink;
use crate::interfaces::Precondition;
use crate::interfaces::TrashScope;
use crate::interfaces::WikiStore;
use crate::interfaces::WriteBatch;
use crate::interfaces::WriteOp;
use crate::runtime::effects::Effects;
use crate::runtime::effects::PendingNotification;
use crate::runtime::engine::ConflictKind;
use crate::runtime::engine::Prepared;
use crate::runtime::engine::RequestContext;
use crate::runtime::engine::ReviewStep;
use crate::runtime::engine::TransitionError;
use crate::runtime::engine::WorkflowEngine;
use crate::runtime::engine::WorkflowError;
use crate::runtime::engine::ensure_can_propose;
use crate::runtime::policy::PolicyEngine;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to create a timeline period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPeriod {
    /// Period title.
    pub title: String,
    /// Period description.
    pub description: String,
    /// Display order; defaults to after the last period.
    pub order: Option<i64>,
    /// Whether the period lies in the future.
    pub is_future: bool,
}

impl NewPeriod {
    /// Creates a request with default ordering.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            order: None,
            is_future: false,
        }
    }
}

/// Proposed period changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodEdit {
    /// Proposed title.
    pub title: String,
    /// Proposed description.
    pub description: String,
    /// Proposed metadata in any accepted shape; `None` keeps the current one.
    pub metadata: Option<Value>,
    /// Author rationale.
    pub change_log: String,
}

// ============================================================================
// SECTION: Period Engine
// ============================================================================

/// Timeline period workflow bound to a workflow engine.
pub struct PeriodEngine<'a, S, N, A> {
    /// Engine providing storage, sinks, and configuration.
    engine: &'a WorkflowEngine<S, N, A>,
}

impl<'a, S, N, A> PeriodEngine<'a, S, N, A>
where
    S: WikiStore,
    N: NotificationSink,
    A: AuditSink,
{
    /// Binds the period workflow to an engine.
    #[must_use]
    pub const fn new(engine: &'a WorkflowEngine<S, N, A>) -> Self {
        Self {
            engine,
        }
    }

    /// Creates a period with a unique slug and an APPROVED seed version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] unless the actor owns the entity
    /// or is a superuser, and [`ConflictKind::DuplicateSlug`] when slug
    /// allocation keeps losing races.
    pub fn create_period(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
        request: &NewPeriod,
    ) -> Result<TimelinePeriod, WorkflowError> {
        self.engine.validate_name(&request.title)?;
        let directory = self.engine.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        let store = self.engine.store();
        self.engine.run(
            "create_period",
            self.engine.config().max_commit_attempts,
            ConflictKind::DuplicateSlug,
            || {
                let entity = self.engine.load_entity(&policy, actor, hid, TrashScope::Active)?;
                if !policy.can_publish(actor, &entity) {
                    return Err(WorkflowError::Forbidden(format!(
                        "actor may not add periods to {hid}"
                    )));
                }
                let existing = store.periods(hid)?;
                let slug = unique_slug(&slugify(&request.title), |candidate| {
                    existing.iter().any(|period| period.slug == candidate)
                });
                let order = request.order.unwrap_or_else(|| {
                    existing.iter().map(|period| period.order).max().map_or(0, |max| max + 1)
                });
                let period = TimelinePeriod {
                    id: self.engine.period_id()?,
                    hid: hid.clone(),
                    title: request.title.clone(),
                    slug,
                    order,
                    is_current: false,
                    is_future: request.is_future,
                    description: request.description.clone(),
                    metadata: Metadata::default(),
                    current_version_number: SEED_VERSION_NUMBER,
                    revision: 0,
                    created_at: ctx.at,
                    updated_at: ctx.at,
                };
                let seed = PeriodVersion {
                    period_id: period.id.clone(),
                    hid: hid.clone(),
                    version_number: SEED_VERSION_NUMBER,
                    proposed_title: period.title.clone(),
                    proposed_description: period.description.clone(),
                    proposed_metadata: Metadata::default(),
                    action: Action::Add,
                    status: VersionStatus::Approved,
                    change_log: String::new(),
                    author: actor.cloned(),
                    reviewer: actor.cloned(),
                    reviewed_at: Some(ctx.at),
                    admin_feedback: None,
                    created_at: ctx.at,
                };
                let mut batch = WriteBatch::new();
                batch
                    .require(Precondition::PeriodAbsent(period.id.clone()))
                    .require(Precondition::PeriodSlugAbsent {
                        hid: hid.clone(),
                        slug: period.slug.clone(),
                    })
                    .write(WriteOp::PutPeriod(period.clone()))
                    .write(WriteOp::PutPeriodVersion(seed));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    AuditAction::Create,
                    period.id.to_string(),
                    json!({ "hid": hid.as_str(), "slug": period.slug, "order": period.order }),
                    ctx.at,
                );
                Ok(Prepared {
                    batch,
                    value: period,
                    effects,
                })
            },
        )
    }

    /// Proposes new title, description, and metadata for a period.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the actor may not propose against the
    /// owning entity or the proposal is malformed.
    pub fn propose_edit(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        edit: &PeriodEdit,
    ) -> Result<PeriodVersion, WorkflowError> {
        self.engine.validate_name(&edit.title)?;
        let metadata = edit.metadata.as_ref().map(Metadata::normalize).transpose()?;
        let audit =
            if metadata.is_some() { AuditAction::ProposeMetadata } else { AuditAction::Create };
        self.submit(ctx, id, Action::Edit, audit, |period| {
            (
                edit.title.clone(),
                edit.description.clone(),
                metadata.clone().unwrap_or_else(|| period.metadata.clone()),
                edit.change_log.clone(),
            )
        })
    }

    /// Proposes deleting a period.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::CurrentPeriodProtected`] for the current
    /// period.
    pub fn propose_delete(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        change_log: impl Into<String>,
    ) -> Result<PeriodVersion, WorkflowError> {
        let change_log = change_log.into();
        self.submit(ctx, id, Action::Delete, AuditAction::Delete, |period| {
            (
                period.title.clone(),
                period.description.clone(),
                period.metadata.clone(),
                change_log.clone(),
            )
        })
    }

    /// Approves a PENDING period proposal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPending`] for non-pending versions.
    pub fn approve(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        number: i64,
        feedback: Option<String>,
    ) -> Result<PeriodVersion, WorkflowError> {
        self.review(ctx, id, number, ReviewStep::Approve, feedback)
    }

    /// Rejects a PENDING period proposal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPending`] for non-pending versions.
    pub fn reject(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        number: i64,
        feedback: Option<String>,
    ) -> Result<PeriodVersion, WorkflowError> {
        self.review(ctx, id, number, ReviewStep::Reject, feedback)
    }

    /// Archives a period proposal.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the version cannot be archived by the
    /// actor.
    pub fn archive(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        number: i64,
        reason: Option<String>,
    ) -> Result<PeriodVersion, WorkflowError> {
        self.review(ctx, id, number, ReviewStep::Archive, reason)
    }

    /// Moves a REJECTED period proposal back to PENDING.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRejected`] when the version is not
    /// REJECTED.
    pub fn restore_rejected(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        number: i64,
    ) -> Result<PeriodVersion, WorkflowError> {
        self.review(ctx, id, number, ReviewStep::Reopen, None)
    }

    /// Creates a new proposal prefilled from a REJECTED period version.
    ///
    /// `title` and `description` override the rejected values when given.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRejected`] when the source is not
    /// REJECTED.
    pub fn retouch(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        source: i64,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<PeriodVersion, WorkflowError> {
        let rejected = self.version_record(id, source)?;
        if rejected.status != VersionStatus::Rejected {
            return Err(TransitionError::NotRejected.into());
        }
        let title = title.unwrap_or_else(|| rejected.proposed_title.clone());
        self.engine.validate_name(&title)?;
        let description = description.unwrap_or_else(|| rejected.proposed_description.clone());
        let audit = match rejected.action {
            Action::Delete => AuditAction::Delete,
            _ => AuditAction::Create,
        };
        self.submit(ctx, id, rejected.action, audit, |_| {
            (
                title.clone(),
                description.clone(),
                rejected.proposed_metadata.clone(),
                format!("retouch of version {source}"),
            )
        })
    }

    /// Creates a new EDIT proposal restoring an earlier period snapshot.
    ///
    /// The source may be the LIVE or a HISTORY version, or the seed.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRestorable`] for any other source.
    pub fn revert_to(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        source: i64,
    ) -> Result<PeriodVersion, WorkflowError> {
        let snapshot = self.version_record(id, source)?;
        let restorable = source == SEED_VERSION_NUMBER
            || matches!(snapshot.status, VersionStatus::Live | VersionStatus::History);
        if !restorable || snapshot.action == Action::Delete {
            return Err(TransitionError::NotRestorable.into());
        }
        self.submit(ctx, id, Action::Edit, AuditAction::Restore, |_| {
            (
                snapshot.proposed_title.clone(),
                snapshot.proposed_description.clone(),
                snapshot.proposed_metadata.clone(),
                format!("restore of version {source}"),
            )
        })
    }

    /// Publishes an APPROVED period proposal.
    ///
    /// EDIT overwrites title, description, and metadata (re-deriving a unique
    /// slug when the title changes); DELETE removes the period with all of its
    /// versions, in which case the returned version is no longer stored.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotApproved`] for unapproved versions,
    /// [`TransitionError::CurrentPeriodProtected`] when deleting the current
    /// period, and [`ConflictKind::Superseded`] when a newer change won.
    pub fn publish(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        number: i64,
    ) -> Result<PeriodVersion, WorkflowError> {
        let directory = self.engine.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        let store = self.engine.store();
        self.engine.run("publish_period", 1, ConflictKind::Superseded, || {
            let (period, entity) = self.load(&policy, actor, id)?;
            let original = self.version_record(id, number)?;
            if !policy.can_publish(actor, &entity) {
                return Err(WorkflowError::Forbidden(format!("actor may not publish period {id}")));
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
            // The seed shares the initial current number and is never published.
            if number <= period.current_version_number {
                return Err(WorkflowError::Conflict {
                    kind: ConflictKind::Superseded,
                    detail: format!(
                        "period version {number} is not newer than current version {}",
                        period.current_version_number
                    ),
                });
            }
            let mut published = original.clone();
            if auto_approve || published.reviewer.is_none() {
                published.reviewer = actor.cloned();
                published.reviewed_at = Some(ctx.at);
            }
            published.status = VersionStatus::Live;

            let mut batch = WriteBatch::new();
            batch
                .require(Precondition::PeriodRevision {
                    id: id.clone(),
                    revision: period.revision,
                })
                .require(Precondition::PeriodVersionStatus {
                    id: id.clone(),
                    number,
                    status: original.status,
                });
            if published.action == Action::Delete {
                if period.is_current {
                    return Err(TransitionError::CurrentPeriodProtected.into());
                }
                batch.write(WriteOp::DeletePeriod(id.clone()));
            } else {
                let mut updated = period.clone();
                if published.action == Action::Edit {
                    if published.proposed_title != period.title {
                        let siblings = store.periods(&period.hid)?;
                        let base = slugify(&published.proposed_title);
                        updated.slug = unique_slug(&base, |candidate| {
                            siblings
                                .iter()
                                .any(|other| other.id != period.id && other.slug == candidate)
                        });
                        if updated.slug != period.slug {
                            batch.require(Precondition::PeriodSlugAbsent {
                                hid: period.hid.clone(),
                                slug: updated.slug.clone(),
                            });
                        }
                    }
                    updated.title.clone_from(&published.proposed_title);
                    updated.description.clone_from(&published.proposed_description);
                    updated.metadata = published.proposed_metadata.clone();
                }
                updated.current_version_number = number;
                updated.revision = period.revision.saturating_add(1);
                updated.updated_at = ctx.at;
                for mut other in store.period_versions(id)? {
                    if other.version_number == number {
                        continue;
                    }
                    let next = if other.status == VersionStatus::Live {
                        VersionStatus::History
                    } else if self.engine.config().archive_stale_on_publish
                        && other.status.is_open()
                        && other.version_number != SEED_VERSION_NUMBER
                        && other.version_number < number
                    {
                        VersionStatus::Archived
                    } else {
                        continue;
                    };
                    batch.require(Precondition::PeriodVersionStatus {
                        id: id.clone(),
                        number: other.version_number,
                        status: other.status,
                    });
                    other.status = next;
                    batch.write(WriteOp::PutPeriodVersion(other));
                }
                batch
                    .write(WriteOp::PutPeriodVersion(published.clone()))
                    .write(WriteOp::PutPeriod(updated));
            }
            let mut effects = Effects::new();
            if auto_approve {
                effects.audit(
                    actor,
                    AuditAction::Approve,
                    id.to_string(),
                    json!({ "version_number": number, "auto": true }),
                    ctx.at,
                );
            }
            effects.audit(
                actor,
                AuditAction::Publish,
                id.to_string(),
                json!({
                    "hid": period.hid.as_str(),
                    "version_number": number,
                    "action": published.action.as_str(),
                }),
                ctx.at,
            );
            effects.notify(
                published.author.as_ref(),
                actor,
                PendingNotification::new(
                    NotificationKind::ProposalPublished,
                    id.to_string(),
                    Some(number),
                    format!("period version {number} is live"),
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

    /// Makes a period the current one, demoting the previous current period.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Forbidden`] unless the actor owns the entity
    /// or is a superuser.
    pub fn activate(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
    ) -> Result<TimelinePeriod, WorkflowError> {
        let directory = self.engine.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        let store = self.engine.store();
        self.engine.run(
            "activate_period",
            self.engine.config().max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let (period, entity) = self.load(&policy, actor, id)?;
                if !policy.can_publish(actor, &entity) {
                    return Err(WorkflowError::Forbidden(format!(
                        "actor may not activate period {id}"
                    )));
                }
                if period.is_current {
                    return Ok(Prepared {
                        batch: WriteBatch::new(),
                        value: period,
                        effects: Effects::new(),
                    });
                }
                let mut batch = WriteBatch::new();
                let mut previous = None;
                for mut other in store.periods(&period.hid)? {
                    if !other.is_current {
                        continue;
                    }
                    batch.require(Precondition::PeriodRevision {
                        id: other.id.clone(),
                        revision: other.revision,
                    });
                    previous = Some(other.id.clone());
                    other.is_current = false;
                    other.revision = other.revision.saturating_add(1);
                    other.updated_at = ctx.at;
                    batch.write(WriteOp::PutPeriod(other));
                }
                let mut activated = period.clone();
                activated.is_current = true;
                activated.is_future = false;
                activated.revision = period.revision.saturating_add(1);
                activated.updated_at = ctx.at;
                batch
                    .require(Precondition::PeriodRevision {
                        id: id.clone(),
                        revision: period.revision,
                    })
                    .write(WriteOp::PutPeriod(activated.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    AuditAction::ActivatePeriod,
                    id.to_string(),
                    json!({
                        "hid": period.hid.as_str(),
                        "previous": previous.as_ref().map(PeriodId::as_str),
                    }),
                    ctx.at,
                );
                Ok(Prepared {
                    batch,
                    value: activated,
                    effects,
                })
            },
        )
    }

    /// Lists the periods of a visible entity ordered by `(order, created_at)`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is not visible.
    pub fn get_periods(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
    ) -> Result<Vec<TimelinePeriod>, WorkflowError> {
        let directory = self.engine.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        self.engine.load_entity(&policy, ctx.actor_id(), hid, TrashScope::Active)?;
        Ok(self.engine.store().periods(hid)?)
    }

    /// Returns the current period of a visible entity.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the entity is not visible.
    pub fn current_period(
        &self,
        ctx: &RequestContext,
        hid: &Hid,
    ) -> Result<Option<TimelinePeriod>, WorkflowError> {
        Ok(self.get_periods(ctx, hid)?.into_iter().find(|period| period.is_current))
    }

    /// Lists the versions of a period, seed first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] when the period is not visible.
    pub fn versions(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
    ) -> Result<Vec<PeriodVersion>, WorkflowError> {
        let directory = self.engine.snapshot()?;
        self.load(&PolicyEngine::new(&directory), ctx.actor_id(), id)?;
        Ok(self.engine.store().period_versions(id)?)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Loads a period and its visible, active entity.
    fn load(
        &self,
        policy: &PolicyEngine<'_>,
        actor: Option<&ActorId>,
        id: &PeriodId,
    ) -> Result<(TimelinePeriod, Entity), WorkflowError> {
        let period = self
            .engine
            .store()
            .period(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("period {id}")))?;
        let entity = self.engine.load_entity(policy, actor, &period.hid, TrashScope::Active)?;
        Ok((period, entity))
    }

    /// Loads a period version.
    fn version_record(&self, id: &PeriodId, number: i64) -> Result<PeriodVersion, WorkflowError> {
        self.engine
            .store()
            .period_version(id, number)?
            .ok_or_else(|| WorkflowError::NotFound(format!("period version {id}/{number}")))
    }

    /// Appends a PENDING proposal to a period.
    ///
    /// `content` yields the proposed title, description, metadata, and change
    /// log from the current period.
    fn submit(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        action: Action,
        audit: AuditAction,
        content: impl Fn(&TimelinePeriod) -> (String, String, Metadata, String),
    ) -> Result<PeriodVersion, WorkflowError> {
        let directory = self.engine.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        let store = self.engine.store();
        self.engine.run(
            "submit_period",
            self.engine.config().max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let (period, entity) = self.load(&policy, actor, id)?;
                if action == Action::Delete && period.is_current {
                    return Err(TransitionError::CurrentPeriodProtected.into());
                }
                ensure_can_propose(&policy, actor, &entity)?;
                let versions = store.period_versions(id)?;
                let number = versions
                    .iter()
                    .map(|version| version.version_number)
                    .max()
                    .unwrap_or(SEED_VERSION_NUMBER)
                    .saturating_add(1);
                let created_at = versions
                    .iter()
                    .map(|version| version.created_at)
                    .max()
                    .map_or(ctx.at, |floor| ctx.at.at_least(floor));
                let (title, description, metadata, change_log) = content(&period);
                let version = PeriodVersion {
                    period_id: id.clone(),
                    hid: period.hid.clone(),
                    version_number: number,
                    proposed_title: title,
                    proposed_description: description,
                    proposed_metadata: metadata,
                    action,
                    status: VersionStatus::Pending,
                    change_log,
                    author: actor.cloned(),
                    reviewer: None,
                    reviewed_at: None,
                    admin_feedback: None,
                    created_at,
                };
                let mut batch = WriteBatch::new();
                batch
                    .require(Precondition::PeriodVersionAbsent {
                        id: id.clone(),
                        number,
                    })
                    .write(WriteOp::PutPeriodVersion(version.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    audit,
                    id.to_string(),
                    json!({
                        "hid": period.hid.as_str(),
                        "version_number": number,
                        "action": action.as_str(),
                    }),
                    ctx.at,
                );
                effects.notify(
                    entity.author.as_ref(),
                    actor,
                    PendingNotification::new(
                        NotificationKind::ProposalSubmitted,
                        id.to_string(),
                        Some(number),
                        format!("new {action} proposal on period {}", period.title),
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

    /// Applies a review step to a period version.
    fn review(
        &self,
        ctx: &RequestContext,
        id: &PeriodId,
        number: i64,
        step: ReviewStep,
        feedback: Option<String>,
    ) -> Result<PeriodVersion, WorkflowError> {
        let directory = self.engine.snapshot()?;
        let policy = PolicyEngine::new(&directory);
        let actor = ctx.actor_id();
        self.engine.run(
            "review_period",
            self.engine.config().max_commit_attempts,
            ConflictKind::RetryBudgetExhausted,
            || {
                let (_, entity) = self.load(&policy, actor, id)?;
                let original = self.version_record(id, number)?;
                step.check(original.status)?;
                let own = actor.is_some() && original.author.as_ref() == actor;
                let permitted = policy.can_approve(actor, &original, &entity)
                    || (own && step.allows_proposer());
                if !permitted {
                    return Err(WorkflowError::Forbidden(format!(
                        "actor may not review period version {id}/{number}"
                    )));
                }
                let mut reviewed = original.clone();
                reviewed.status = step.target();
                if !own {
                    reviewed.reviewer = actor.cloned();
                }
                reviewed.reviewed_at = Some(ctx.at);
                if feedback.is_some() {
                    reviewed.admin_feedback.clone_from(&feedback);
                }
                let mut batch = WriteBatch::new();
                batch
                    .require(Precondition::PeriodVersionStatus {
                        id: id.clone(),
                        number,
                        status: original.status,
                    })
                    .write(WriteOp::PutPeriodVersion(reviewed.clone()));
                let mut effects = Effects::new();
                effects.audit(
                    actor,
                    step.audit_action(),
                    id.to_string(),
                    json!({
                        "version_number": number,
                        "from": original.status.as_str(),
                        "to": reviewed.status.as_str(),
                    }),
                    ctx.at,
                );
                effects.notify(
                    reviewed.author.as_ref(),
                    actor,
                    PendingNotification::new(
                        step.notification(),
                        id.to_string(),
                        Some(number),
                        format!("period version {number} is now {}", reviewed.status),
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
}
