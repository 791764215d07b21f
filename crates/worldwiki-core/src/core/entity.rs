// worldwiki-core/src/core/entity.rs
// ============================================================================
// Module: Worldwiki Entities
// Description: Hierarchical entity nodes and their lifecycle status.
// Purpose: Model the current published state of every node in the tree.
// Dependencies: crate::core::{hid, identifiers, metadata, time}, serde
// ============================================================================

//! ## Overview
//! An [`Entity`] is the current published state of a node. Proposed changes
//! never touch it directly; only publishing a version rewrites it. The
//! `revision` counter is bumped on every write and used by stores as the
//! optimistic-concurrency token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hid::Hid;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::PublicId;
use crate::core::metadata::Metadata;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel name carried by structural gap nodes.
pub const STRUCTURAL_NAME: &str = "_STRUCTURAL_";

// ============================================================================
// SECTION: Status
// ============================================================================

/// Entity lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    /// Created but never published.
    Draft,
    /// Published.
    Live,
    /// Unpublished by its owner.
    Offline,
    /// Published and closed to external proposals.
    Locked,
    /// Soft-deleted.
    Deleted,
}

impl EntityStatus {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Live => "LIVE",
            Self::Offline => "OFFLINE",
            Self::Locked => "LOCKED",
            Self::Deleted => "DELETED",
        }
    }

    /// Returns true for LIVE and LOCKED, the states with a LIVE version on display.
    #[must_use]
    pub const fn is_published_state(self) -> bool {
        matches!(self, Self::Live | Self::Locked)
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Entity
// ============================================================================

/// Hierarchical wiki node.
///
/// # Invariants
/// - `current_version_number == 0` iff no version has reached LIVE.
/// - `is_active == false` implies `deleted_at.is_some()`.
/// - `status == Live` implies version `current_version_number` is LIVE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Hierarchical identifier.
    pub hid: Hid,
    /// Stable public alias.
    pub public_id: PublicId,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Canonical metadata.
    pub metadata: Metadata,
    /// Lifecycle status.
    pub status: EntityStatus,
    /// Public visibility flag.
    pub visibility_public: bool,
    /// Owning actor; `None` means system-owned.
    pub author: Option<ActorId>,
    /// False while the entity sits in the trash.
    pub is_active: bool,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<Timestamp>,
    /// Published status held when the entity was trashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_before_delete: Option<EntityStatus>,
    /// Version number currently LIVE (0 when never published).
    pub current_version_number: u64,
    /// Whether non-owners may submit proposals.
    pub allow_proposals: bool,
    /// Optimistic-concurrency revision.
    pub revision: u64,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

impl Entity {
    /// Creates a never-published draft entity.
    #[must_use]
    pub fn draft(
        hid: Hid,
        public_id: PublicId,
        name: impl Into<String>,
        description: impl Into<String>,
        author: Option<ActorId>,
        at: Timestamp,
    ) -> Self {
        Self {
            hid,
            public_id,
            name: name.into(),
            description: description.into(),
            metadata: Metadata::default(),
            status: EntityStatus::Draft,
            visibility_public: false,
            author,
            is_active: true,
            deleted_at: None,
            status_before_delete: None,
            current_version_number: 0,
            allow_proposals: true,
            revision: 0,
            created_at: at,
            updated_at: at,
        }
    }

    /// Returns true when the entity is published and publicly visible.
    ///
    /// Locked entities remain published, so they count as LIVE here.
    #[must_use]
    pub fn is_public_live(&self) -> bool {
        self.status.is_published_state() && self.visibility_public
    }

    /// Returns true when the entity is a structural gap.
    #[must_use]
    pub fn is_gap(&self) -> bool {
        self.metadata.is_gap()
    }

    /// Returns true when the entity has been published at least once.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.current_version_number > 0
    }

    /// Returns true when `actor` owns this entity.
    #[must_use]
    pub fn is_owned_by(&self, actor: &ActorId) -> bool {
        self.author.as_ref() == Some(actor)
    }
}
