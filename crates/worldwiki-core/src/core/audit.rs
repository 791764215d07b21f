// worldwiki-core/src/core/audit.rs
// ============================================================================
// Module: Worldwiki Audit and Notification Records
// Description: Append-only audit events and fire-and-forget notifications.
// Purpose: Define the records emitted after workflow commits.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events and notifications are emitted after a workflow transaction
//! commits. Both are eventually consistent: sinks may drop or duplicate them
//! without affecting stored state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActorId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audited workflow action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Proposal or entity creation.
    Create,
    /// Proposal approval.
    Approve,
    /// Proposal rejection.
    Reject,
    /// Proposal withdrawal or supersession.
    Archive,
    /// Publication of a version.
    Publish,
    /// Restore of a rejected, historical, or trashed item.
    Restore,
    /// Deletion proposal or hard delete.
    Delete,
    /// Visibility change proposal.
    ToggleVisibility,
    /// Cover change proposal.
    SetCover,
    /// Metadata proposal.
    ProposeMetadata,
    /// Proposal of a generated cover.
    ProposeCover,
    /// Cover image upload.
    UploadPhoto,
    /// Entity lock toggle.
    ToggleLock,
    /// External proposal toggle.
    ToggleProposals,
    /// Timeline period activation.
    ActivatePeriod,
}

impl AuditAction {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Archive => "ARCHIVE",
            Self::Publish => "PUBLISH",
            Self::Restore => "RESTORE",
            Self::Delete => "DELETE",
            Self::ToggleVisibility => "TOGGLE_VISIBILITY",
            Self::SetCover => "SET_COVER",
            Self::ProposeMetadata => "PROPOSE_METADATA",
            Self::ProposeCover => "PROPOSE_COVER",
            Self::UploadPhoto => "UPLOAD_PHOTO",
            Self::ToggleLock => "TOGGLE_LOCK",
            Self::ToggleProposals => "TOGGLE_PROPOSALS",
            Self::ActivatePeriod => "ACTIVATE_PERIOD",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Acting principal (`None` for system actions).
    pub actor: Option<ActorId>,
    /// Audited action.
    pub action: AuditAction,
    /// Target identifier (HID or period ID).
    pub target_id: String,
    /// Structured details.
    pub details: Value,
    /// Event timestamp.
    pub timestamp: Timestamp,
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A proposal was submitted against an entity the recipient owns.
    ProposalSubmitted,
    /// The recipient's proposal was approved.
    ProposalApproved,
    /// The recipient's proposal was rejected.
    ProposalRejected,
    /// The recipient's proposal was published.
    ProposalPublished,
    /// The recipient's proposal was archived.
    ProposalArchived,
}

/// Fire-and-forget notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient actor.
    pub recipient: ActorId,
    /// Notification category.
    pub kind: NotificationKind,
    /// Target identifier (HID or period ID).
    pub target_id: String,
    /// Related version number.
    pub version_number: Option<i64>,
    /// Human-readable message.
    pub message: String,
    /// Emission timestamp.
    pub at: Timestamp,
}
