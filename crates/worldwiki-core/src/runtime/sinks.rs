// worldwiki-core/src/runtime/sinks.rs
// ============================================================================
// Module: Worldwiki In-Memory Sinks
// Description: Recording and no-op audit and notification sinks.
// Purpose: Capture side effects in tests and disable them when not wanted.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Recording sinks keep every event in emission order behind a mutex so tests
//! can assert on them. No-op sinks accept and drop everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::core::AuditEvent;
use crate::core::Notification;
use crate::interfaces::AuditError;
use crate::interfaces::AuditSink;
use crate::interfaces::NotificationError;
use crate::interfaces::NotificationSink;

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit log that records events in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLog {
    /// Recorded events.
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns recorded events for a target identifier.
    #[must_use]
    pub fn events_for(&self, target_id: &str) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|event| event.target_id == target_id).collect()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|_| AuditError::Store("audit log mutex poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Audit sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Notifications
// ============================================================================

/// Notification sink that records notifications in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationSink {
    /// Recorded notifications.
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded notifications.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().map(|items| items.clone()).unwrap_or_default()
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.notifications
            .lock()
            .map_err(|_| NotificationError::Io("notification recorder mutex poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Notification sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn notify(&self, _notification: &Notification) -> Result<(), NotificationError> {
        Ok(())
    }
}
