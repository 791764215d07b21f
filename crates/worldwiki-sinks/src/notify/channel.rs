// worldwiki-sinks/src/notify/channel.rs
// ============================================================================
// Module: Worldwiki Channel Notification Sink
// Description: Channel-based sink for asynchronous delivery.
// Purpose: Send notifications through a Tokio mpsc channel.
// Dependencies: worldwiki-core, tokio
// ============================================================================

//! ## Overview
//! [`ChannelNotificationSink`] hands notifications to an async consumer
//! through a bounded `tokio::sync::mpsc` channel. It never waits: a full
//! channel yields [`NotificationError::Full`] and a dropped receiver yields
//! [`NotificationError::Closed`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use worldwiki_core::Notification;
use worldwiki_core::NotificationError;
use worldwiki_core::NotificationSink;

// ============================================================================
// SECTION: Channel Sink
// ============================================================================

/// Channel-based notification sink.
///
/// # Invariants
/// - Each successful delivery enqueues exactly one notification.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    /// Sender used to dispatch notifications.
    sender: Sender<Notification>,
}

impl ChannelNotificationSink {
    /// Creates a channel sink.
    #[must_use]
    pub const fn new(sender: Sender<Notification>) -> Self {
        Self {
            sender,
        }
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sender.try_send(notification.clone()).map_err(|err| match err {
            TrySendError::Full(_) => NotificationError::Full,
            TrySendError::Closed(_) => NotificationError::Closed,
        })
    }
}
