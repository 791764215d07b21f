// worldwiki-core/src/runtime/policy.rs
// ============================================================================
// Module: Worldwiki Policy Engine
// Description: Pure visibility and authorization decisions.
// Purpose: Centralize every permission check behind one consistent rule set.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The policy engine evaluates decisions against an immutable
//! [`ActorDirectory`] snapshot and performs no I/O. Three call sites consume
//! it: list queries through [`PolicyEngine::visibility_filter`], detail reads
//! through [`PolicyEngine::can_view`], and workflow intents through the
//! `can_*` predicates.
//!
//! Security posture: unknown actors are treated as anonymous and every rule
//! fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::Actor;
use crate::core::ActorDirectory;
use crate::core::ActorId;
use crate::core::Entity;
use crate::core::EntityStatus;
use crate::core::Proposal;
use crate::core::ProposalFilter;
use crate::core::ProposalSilo;
use crate::core::Rank;
use crate::core::VisibilityFilter;
use crate::core::VisibilityRules;

// ============================================================================
// SECTION: Policy Engine
// ============================================================================

/// Pure policy decisions over an actor snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEngine<'a> {
    /// Actor snapshot used for every decision.
    directory: &'a ActorDirectory,
}

impl<'a> PolicyEngine<'a> {
    /// Creates a policy engine over an actor snapshot.
    #[must_use]
    pub const fn new(directory: &'a ActorDirectory) -> Self {
        Self {
            directory,
        }
    }

    /// Resolves an optional identity against the snapshot.
    fn resolve(&self, actor: Option<&ActorId>) -> Option<&'a Actor> {
        actor.and_then(|id| self.directory.get(id))
    }

    /// Returns true when the identity names a superuser.
    #[must_use]
    pub fn is_superuser(&self, actor: Option<&ActorId>) -> bool {
        self.resolve(actor).is_some_and(|actor| actor.is_superuser)
    }

    /// Returns true when the entity has no author or a superuser author.
    #[must_use]
    pub fn is_system_owned(&self, entity: &Entity) -> bool {
        entity.author.as_ref().is_none_or(|author| self.directory.is_superuser(author))
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    /// Returns true when the actor may view the entity.
    #[must_use]
    pub fn can_view(&self, actor: Option<&ActorId>, entity: &Entity) -> bool {
        let Some(actor) = self.resolve(actor) else {
            return entity.is_public_live();
        };
        if actor.is_superuser || entity.is_public_live() {
            return true;
        }
        if actor.is_explorer() {
            return false;
        }
        if entity.is_owned_by(&actor.id) {
            return true;
        }
        if !entity.is_published() {
            return false;
        }
        let team_linked = entity
            .author
            .as_ref()
            .is_some_and(|author| self.directory.is_team_linked(&actor.id, author));
        if team_linked {
            return true;
        }
        actor.is_admin_rank() && self.is_system_owned(entity)
    }

    /// Returns the query-shape equivalent of [`PolicyEngine::can_view`].
    #[must_use]
    pub fn visibility_filter(&self, actor: Option<&ActorId>) -> VisibilityFilter {
        let Some(actor) = self.resolve(actor) else {
            return VisibilityFilter::public_only();
        };
        if actor.is_superuser {
            return VisibilityFilter::Everything;
        }
        if actor.is_explorer() {
            return VisibilityFilter::public_only();
        }
        let mut team_authors = actor.bosses.clone();
        team_authors.extend(self.directory.minions_of(&actor.id));
        let system_owned = actor.is_admin_rank();
        VisibilityFilter::Restricted(VisibilityRules {
            viewer: Some(actor.id.clone()),
            team_authors,
            system_owned,
            superusers: if system_owned { self.directory.superusers() } else { BTreeSet::new() },
        })
    }

    /// Returns the filter selecting trashed entities the actor may manage.
    ///
    /// Returns `None` for anonymous and unknown actors.
    #[must_use]
    pub fn trash_filter(&self, actor: Option<&ActorId>) -> Option<VisibilityFilter> {
        let actor = self.resolve(actor)?;
        if actor.is_superuser {
            return Some(VisibilityFilter::Everything);
        }
        Some(VisibilityFilter::Restricted(VisibilityRules {
            viewer: Some(actor.id.clone()),
            ..VisibilityRules::default()
        }))
    }

    // ------------------------------------------------------------------------
    // Propose
    // ------------------------------------------------------------------------

    /// Returns true when the actor works for the entity's owner or, as an
    /// administrator, on system-owned content.
    #[must_use]
    pub fn is_collaborator(&self, actor: Option<&ActorId>, entity: &Entity) -> bool {
        let Some(actor) = self.resolve(actor) else {
            return false;
        };
        if actor.is_explorer() {
            return false;
        }
        if entity.author.as_ref().is_some_and(|author| actor.bosses.contains(author)) {
            return true;
        }
        actor.is_admin_rank() && self.is_system_owned(entity)
    }

    /// Returns true when the actor may submit proposals against the entity.
    ///
    /// Locked entities and entities with proposals disabled accept proposals
    /// only from their owner or a superuser.
    #[must_use]
    pub fn can_propose(&self, actor: Option<&ActorId>, entity: &Entity) -> bool {
        let Some(resolved) = self.resolve(actor) else {
            return false;
        };
        if resolved.is_superuser || entity.is_owned_by(&resolved.id) {
            return true;
        }
        let closed = entity.status == EntityStatus::Locked || !entity.allow_proposals;
        !closed && self.is_collaborator(actor, entity)
    }

    /// Returns true when the actor may create a new root world.
    #[must_use]
    pub fn can_create_root(&self, actor: Option<&ActorId>) -> bool {
        self.resolve(actor).is_some_and(|actor| actor.is_superuser || !actor.is_explorer())
    }

    // ------------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------------

    /// Returns true when the actor may approve or reject the proposal.
    #[must_use]
    pub fn can_approve(
        &self,
        actor: Option<&ActorId>,
        proposal: &impl Proposal,
        entity: &Entity,
    ) -> bool {
        let Some(actor) = self.resolve(actor) else {
            return false;
        };
        if actor.is_superuser || entity.is_owned_by(&actor.id) {
            return true;
        }
        let Some(proposer) = proposal.proposer() else {
            return false;
        };
        if *proposer == actor.id {
            return false;
        }
        actor.is_admin_rank() && self.directory.is_boss_of(&actor.id, proposer)
    }

    /// Returns true when the actor may publish proposals against the entity.
    #[must_use]
    pub fn can_publish(&self, actor: Option<&ActorId>, entity: &Entity) -> bool {
        self.resolve(actor)
            .is_some_and(|actor| actor.is_superuser || entity.is_owned_by(&actor.id))
    }

    /// Returns true when the actor may moderate a comment on the entity.
    #[must_use]
    pub fn can_moderate_comment(
        &self,
        actor: Option<&ActorId>,
        comment_author: &ActorId,
        target: &Entity,
    ) -> bool {
        self.resolve(actor).is_some_and(|actor| {
            actor.is_superuser || actor.id == *comment_author || target.is_owned_by(&actor.id)
        })
    }

    /// Returns the dashboard silo for the actor.
    #[must_use]
    pub fn proposal_filter(&self, actor: &ActorId) -> ProposalFilter {
        match self.directory.get(actor) {
            Some(resolved) if resolved.is_superuser || resolved.rank == Rank::Superadmin => {
                ProposalFilter::Everything
            }
            resolved => ProposalFilter::Silo(ProposalSilo {
                viewer: actor.clone(),
                minions: self.directory.minions_of(actor),
                reviews_minions: resolved.is_some_and(Actor::is_admin_rank),
            }),
        }
    }
}
