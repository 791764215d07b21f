// worldwiki-core/src/core/filter.rs
// ============================================================================
// Module: Worldwiki Query Filters
// Description: Data predicates produced by the policy engine for list queries.
// Purpose: Let stores filter rows before returning them instead of post-filtering.
// Dependencies: crate::core::{entity, identifiers, version}
// ============================================================================

//! ## Overview
//! Filters are plain data so that every store can compile them into its own
//! query language (the SQLite backend emits a `WHERE` clause) while the
//! in-memory store evaluates [`VisibilityFilter::matches`] directly. Both must
//! select exactly the rows the per-row policy predicates would admit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::entity::Entity;
use crate::core::identifiers::ActorId;
use crate::core::version::Version;

// ============================================================================
// SECTION: Entity Visibility
// ============================================================================

/// Row-level visibility rules for a restricted viewer.
///
/// An entity matches when any of these holds:
/// - it is published (LIVE or LOCKED) and public;
/// - its author is `viewer`;
/// - it has been published and its author is in `team_authors`;
/// - it has been published, `system_owned` is set, and its author is absent
///   or listed in `superusers`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityRules {
    /// Viewer whose own entities are always visible.
    pub viewer: Option<ActorId>,
    /// Authors linked to the viewer by a supervision edge.
    pub team_authors: BTreeSet<ActorId>,
    /// Whether system-owned published entities are visible.
    pub system_owned: bool,
    /// Superuser identities treated as system owners.
    pub superusers: BTreeSet<ActorId>,
}

/// Query-shape visibility predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityFilter {
    /// Every entity is visible.
    Everything,
    /// Entities admitted by the rules are visible.
    Restricted(VisibilityRules),
}

impl VisibilityFilter {
    /// Filter admitting only published public entities.
    #[must_use]
    pub fn public_only() -> Self {
        Self::Restricted(VisibilityRules::default())
    }

    /// Returns true when the entity passes the filter.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        let Self::Restricted(rules) = self else {
            return true;
        };
        if entity.is_public_live() {
            return true;
        }
        let author = entity.author.as_ref();
        if rules.viewer.is_some() && author == rules.viewer.as_ref() {
            return true;
        }
        if !entity.is_published() {
            return false;
        }
        if author.is_some_and(|author| rules.team_authors.contains(author)) {
            return true;
        }
        rules.system_owned && author.is_none_or(|author| rules.superusers.contains(author))
    }
}

// ============================================================================
// SECTION: Proposal Visibility
// ============================================================================

/// Dashboard silo for a single reviewer.
///
/// A proposal matches when any of these holds:
/// - the viewer authored it;
/// - the viewer owns the target entity;
/// - a minion of the viewer authored it and the target entity is owned by the
///   viewer or one of the viewer's minions;
/// - a minion of the viewer authored it and the viewer reviews minion work
///   anywhere (admin rank), whoever owns the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSilo {
    /// Reviewer identity.
    pub viewer: ActorId,
    /// Minions supervised by the reviewer.
    pub minions: BTreeSet<ActorId>,
    /// True when the reviewer may approve minion proposals on any entity.
    pub reviews_minions: bool,
}

/// Query-shape proposal predicate for dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalFilter {
    /// Every proposal is visible.
    Everything,
    /// Proposals inside the reviewer's ownership tree are visible.
    Silo(ProposalSilo),
}

impl ProposalFilter {
    /// Returns true when the proposal passes the filter.
    #[must_use]
    pub fn matches(&self, version: &Version, entity_author: Option<&ActorId>) -> bool {
        let Self::Silo(silo) = self else {
            return true;
        };
        let proposer = version.author.as_ref();
        if proposer == Some(&silo.viewer) || entity_author == Some(&silo.viewer) {
            return true;
        }
        let proposer_is_minion = proposer.is_some_and(|author| silo.minions.contains(author));
        let owner_in_tree = entity_author.is_some_and(|author| silo.minions.contains(author));
        proposer_is_minion && (silo.reviews_minions || owner_in_tree)
    }
}
