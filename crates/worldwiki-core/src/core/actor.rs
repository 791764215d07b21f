// worldwiki-core/src/core/actor.rs
// ============================================================================
// Module: Worldwiki Actors
// Description: Principals, rank lattice, and boss/minion supervision links.
// Purpose: Provide the principal model consumed by the policy engine.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Actors carry a rank from the lattice `EXPLORER < USER < SUBADMIN < ADMIN <
//! SUPERADMIN` plus an orthogonal superuser flag that always wins. The
//! supervision relation is directed: an actor lists its bosses, and the
//! collaborator (minion) view is derived from the inverse edges.
//!
//! [`ActorDirectory`] is an immutable per-request snapshot of actors used by
//! the policy engine so decisions never perform I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;

// ============================================================================
// SECTION: Rank
// ============================================================================

/// Actor rank lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    /// Read-only visitor.
    Explorer,
    /// Regular contributor (minion).
    #[serde(alias = "MINION")]
    User,
    /// Sub-administrator.
    Subadmin,
    /// Administrator.
    Admin,
    /// Super-administrator.
    Superadmin,
}

impl Rank {
    /// Returns true for ADMIN and SUPERADMIN.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explorer => "EXPLORER",
            Self::User => "USER",
            Self::Subadmin => "SUBADMIN",
            Self::Admin => "ADMIN",
            Self::Superadmin => "SUPERADMIN",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Actor
// ============================================================================

/// Principal able to act on the wiki.
///
/// # Invariants
/// - `bosses` never contains the actor itself.
/// - `is_superuser` is independent of `rank`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identity.
    pub id: ActorId,
    /// Rank within the lattice.
    pub rank: Rank,
    /// Superuser flag (overrides rank).
    #[serde(default)]
    pub is_superuser: bool,
    /// Avatar filename.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Actors supervising this one.
    #[serde(default)]
    pub bosses: BTreeSet<ActorId>,
}

impl Actor {
    /// Creates an actor with the given rank and no bosses.
    #[must_use]
    pub fn new(id: impl Into<ActorId>, rank: Rank) -> Self {
        Self {
            id: id.into(),
            rank,
            is_superuser: false,
            avatar: None,
            bosses: BTreeSet::new(),
        }
    }

    /// Creates a superuser actor.
    #[must_use]
    pub fn superuser(id: impl Into<ActorId>) -> Self {
        Self {
            is_superuser: true,
            ..Self::new(id, Rank::Superadmin)
        }
    }

    /// Returns a copy with an extra boss link.
    #[must_use]
    pub fn with_boss(mut self, boss: impl Into<ActorId>) -> Self {
        let boss = boss.into();
        if boss != self.id {
            self.bosses.insert(boss);
        }
        self
    }

    /// Returns true when the actor has ADMIN or SUPERADMIN rank.
    #[must_use]
    pub const fn is_admin_rank(&self) -> bool {
        self.rank.is_admin()
    }

    /// Returns true when the actor is restricted to public content.
    #[must_use]
    pub fn is_explorer(&self) -> bool {
        !self.is_superuser && self.rank == Rank::Explorer
    }
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Immutable snapshot of actors used for policy decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorDirectory {
    /// Actors keyed by identity.
    actors: BTreeMap<ActorId, Actor>,
}

impl ActorDirectory {
    /// Builds a directory from actors.
    #[must_use]
    pub fn new(actors: impl IntoIterator<Item = Actor>) -> Self {
        Self {
            actors: actors.into_iter().map(|actor| (actor.id.clone(), actor)).collect(),
        }
    }

    /// Inserts or replaces an actor.
    pub fn insert(&mut self, actor: Actor) {
        self.actors.insert(actor.id.clone(), actor);
    }

    /// Returns the actor for an identity.
    #[must_use]
    pub fn get(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    /// Returns every actor ordered by identity.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Returns true when `id` names a superuser.
    #[must_use]
    pub fn is_superuser(&self, id: &ActorId) -> bool {
        self.actors.get(id).is_some_and(|actor| actor.is_superuser)
    }

    /// Returns true when `boss` supervises `minion`.
    #[must_use]
    pub fn is_boss_of(&self, boss: &ActorId, minion: &ActorId) -> bool {
        self.actors.get(minion).is_some_and(|actor| actor.bosses.contains(boss))
    }

    /// Returns true when the two actors share a supervision edge in either direction.
    #[must_use]
    pub fn is_team_linked(&self, left: &ActorId, right: &ActorId) -> bool {
        self.is_boss_of(left, right) || self.is_boss_of(right, left)
    }

    /// Returns the minions (collaborators) supervised by `boss`.
    #[must_use]
    pub fn minions_of(&self, boss: &ActorId) -> BTreeSet<ActorId> {
        self.actors
            .values()
            .filter(|actor| actor.bosses.contains(boss))
            .map(|actor| actor.id.clone())
            .collect()
    }

    /// Returns every superuser identity.
    #[must_use]
    pub fn superusers(&self) -> BTreeSet<ActorId> {
        self.actors
            .values()
            .filter(|actor| actor.is_superuser)
            .map(|actor| actor.id.clone())
            .collect()
    }
}
