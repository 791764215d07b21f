// worldwiki-core/src/runtime/effects.rs
// ============================================================================
// Module: Worldwiki Side Effects
// Description: Post-commit buffer for audit events and notifications.
// Purpose: Emit side effects only after the data change is durable.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Workflow operations stage audit events and notifications while preparing a
//! write batch, then emit them once the batch commits. Emission is best
//! effort: sink failures are logged with `tracing` and never undo the commit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use tracing::warn;

use crate::core::ActorId;
use crate::core::AuditAction;
use crate::core::AuditEvent;
use crate::core::Notification;
use crate::core::NotificationKind;
use crate::core::Timestamp;
use crate::interfaces::AuditSink;
use crate::interfaces::NotificationSink;

// ============================================================================
// SECTION: Effects
// ============================================================================

/// Side effects staged for emission after commit.
#[derive(Debug, Clone, Default)]
pub(crate) struct Effects {
    /// Audit events in emission order.
    audit: Vec<AuditEvent>,
    /// Notifications in emission order.
    notifications: Vec<Notification>,
}

impl Effects {
    /// Creates an empty buffer.
    pub(crate) const fn new() -> Self {
        Self {
            audit: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Stages an audit event.
    pub(crate) fn audit(
        &mut self,
        actor: Option<&ActorId>,
        action: AuditAction,
        target_id: impl Into<String>,
        details: Value,
        timestamp: Timestamp,
    ) {
        self.audit.push(AuditEvent {
            actor: actor.cloned(),
            action,
            target_id: target_id.into(),
            details,
            timestamp,
        });
    }

    /// Stages a notification unless the recipient is absent or is the actor.
    pub(crate) fn notify(
        &mut self,
        recipient: Option<&ActorId>,
        actor: Option<&ActorId>,
        notification: PendingNotification,
    ) {
        let Some(recipient) = recipient else {
            return;
        };
        if actor == Some(recipient) {
            return;
        }
        self.notifications.push(Notification {
            recipient: recipient.clone(),
            kind: notification.kind,
            target_id: notification.target_id,
            version_number: notification.version_number,
            message: notification.message,
            at: notification.at,
        });
    }

    /// Emits every staged effect, logging sink failures.
    pub(crate) fn emit(self, audit: &impl AuditSink, notifications: &impl NotificationSink) {
        for event in &self.audit {
            if let Err(err) = audit.record(event) {
                warn!(
                    action = event.action.as_str(),
                    target = %event.target_id,
                    error = %err,
                    "audit record failed after commit"
                );
            }
        }
        for notification in &self.notifications {
            if let Err(err) = notifications.notify(notification) {
                warn!(
                    recipient = %notification.recipient,
                    target = %notification.target_id,
                    error = %err,
                    "notification dropped"
                );
            }
        }
    }
}

/// Notification body awaiting a recipient.
#[derive(Debug, Clone)]
pub(crate) struct PendingNotification {
    /// Notification category.
    pub(crate) kind: NotificationKind,
    /// Target identifier.
    pub(crate) target_id: String,
    /// Related version number.
    pub(crate) version_number: Option<i64>,
    /// Human-readable message.
    pub(crate) message: String,
    /// Emission timestamp.
    pub(crate) at: Timestamp,
}

impl PendingNotification {
    /// Builds a notification body.
    pub(crate) fn new(
        kind: NotificationKind,
        target_id: impl Into<String>,
        version_number: Option<i64>,
        message: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
            version_number,
            message: message.into(),
            at,
        }
    }
}
