// worldwiki-core/src/core/version.rs
// ============================================================================
// Module: Worldwiki Versions
// Description: Proposals and historical snapshots against entities.
// Purpose: Define the version record, change payloads, and status machine.
// Dependencies: crate::core::{hid, identifiers, metadata, time}, serde
// ============================================================================

//! ## Overview
//! Every mutation to an entity is captured as a [`Version`] carrying a
//! structured [`ChangePayload`]. Versions move through the status machine
//!
//! ```text
//! PENDING -> APPROVED | REJECTED | ARCHIVED
//! APPROVED -> LIVE | ARCHIVED
//! REJECTED -> PENDING | ARCHIVED
//! LIVE -> HISTORY
//! ```
//!
//! HISTORY and ARCHIVED are immutable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hid::Hid;
use crate::core::hid::Level;
use crate::core::identifiers::ActorId;
use crate::core::metadata::Metadata;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    /// Awaiting review.
    Pending,
    /// Approved and awaiting publication.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
    /// Withdrawn or superseded before publication.
    Archived,
    /// Currently published.
    Live,
    /// Previously published and superseded.
    History,
}

impl VersionStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 6] =
        [Self::Pending, Self::Approved, Self::Rejected, Self::Archived, Self::Live, Self::History];

    /// Returns true when the status machine permits `self -> next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected | Self::Archived)
                | (Self::Approved, Self::Live | Self::Archived)
                | (Self::Rejected, Self::Pending | Self::Archived)
                | (Self::Live, Self::History)
        )
    }

    /// Returns true for statuses that never change again.
    #[must_use]
    pub const fn is_immutable(self) -> bool {
        matches!(self, Self::History | Self::Archived)
    }

    /// Returns true for statuses still awaiting a review outcome.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Archived => "ARCHIVED",
            Self::Live => "LIVE",
            Self::History => "HISTORY",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Action and Kind
// ============================================================================

/// Proposal action label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Child creation.
    Add,
    /// Field or metadata edit.
    Edit,
    /// Soft deletion.
    Delete,
    /// Restore from trash.
    Restore,
    /// Cover image change.
    SetCover,
    /// Visibility change.
    ToggleVisibility,
}

impl Action {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
            Self::Restore => "RESTORE",
            Self::SetCover => "SET_COVER",
            Self::ToggleVisibility => "TOGGLE_VISIBILITY",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad category of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    /// Change to the published entity fields.
    Live,
    /// Metadata-only change.
    Metadata,
    /// Timeline period change.
    Timeline,
}

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Structured change descriptor applied on publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangePayload {
    /// Creation of the entity the version belongs to.
    Add {
        /// Level of the created entity.
        level: Level,
        /// Parent HID (`None` for root worlds).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<Hid>,
    },
    /// Name/description edit, optionally replacing metadata properties.
    Edit {
        /// Replacement metadata, present for metadata proposals.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    /// Soft deletion.
    Delete,
    /// Restore from trash.
    Restore,
    /// Cover image change.
    SetCover {
        /// Cover image filename.
        cover_image: String,
    },
    /// Visibility change.
    ToggleVisibility {
        /// Requested public visibility.
        target_visibility: bool,
    },
}

impl ChangePayload {
    /// Returns the action label of this payload.
    #[must_use]
    pub const fn action(&self) -> Action {
        match self {
            Self::Add {
                ..
            } => Action::Add,
            Self::Edit {
                ..
            } => Action::Edit,
            Self::Delete => Action::Delete,
            Self::Restore => Action::Restore,
            Self::SetCover {
                ..
            } => Action::SetCover,
            Self::ToggleVisibility {
                ..
            } => Action::ToggleVisibility,
        }
    }
}

// ============================================================================
// SECTION: Proposal Trait
// ============================================================================

/// Common view over entity and period proposals used by approval policy.
pub trait Proposal {
    /// Returns the actor who authored the proposal.
    fn proposer(&self) -> Option<&ActorId>;

    /// Returns the proposal status.
    fn proposal_status(&self) -> VersionStatus;
}

// ============================================================================
// SECTION: Version
// ============================================================================

/// Proposal or historical snapshot against an entity.
///
/// # Invariants
/// - `version_number` is unique and strictly increasing per entity.
/// - `created_at` is non-decreasing with `version_number`.
/// - HISTORY and ARCHIVED versions are never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Entity the version belongs to.
    pub hid: Hid,
    /// Version number (starting at 1).
    pub version_number: u64,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Review timestamp.
    #[serde(default)]
    pub reviewed_at: Option<Timestamp>,
    /// Proposed display name.
    pub proposed_name: String,
    /// Proposed description.
    pub proposed_description: String,
    /// Structured change.
    pub payload: ChangePayload,
    /// Change category.
    pub kind: ChangeKind,
    /// Workflow status.
    pub status: VersionStatus,
    /// Author rationale.
    #[serde(default)]
    pub change_log: String,
    /// Proposing actor (`None` for system seeds).
    #[serde(default)]
    pub author: Option<ActorId>,
    /// Reviewing actor.
    #[serde(default)]
    pub reviewer: Option<ActorId>,
    /// Reviewer feedback.
    #[serde(default)]
    pub admin_feedback: Option<String>,
}

impl Version {
    /// Returns the action label.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.payload.action()
    }
}

impl Proposal for Version {
    fn proposer(&self) -> Option<&ActorId> {
        self.author.as_ref()
    }

    fn proposal_status(&self) -> VersionStatus {
        self.status
    }
}
