// worldwiki-sinks/src/notify/callback.rs
// ============================================================================
// Module: Worldwiki Callback Notification Sink
// Description: Callback-based sink for in-process delivery.
// Purpose: Invoke a user-provided handler for each notification.
// Dependencies: worldwiki-core
// ============================================================================

//! ## Overview
//! [`CallbackNotificationSink`] delegates delivery to a handler function,
//! which lets hosts bridge notifications into their own transport.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use worldwiki_core::Notification;
use worldwiki_core::NotificationError;
use worldwiki_core::NotificationSink;

// ============================================================================
// SECTION: Callback Sink
// ============================================================================

/// Callback handler signature used by the sink.
type CallbackHandler = dyn Fn(&Notification) -> Result<(), NotificationError> + Send + Sync;

/// Callback-based notification sink.
#[derive(Clone)]
pub struct CallbackNotificationSink {
    /// Handler invoked with each notification.
    handler: Arc<CallbackHandler>,
}

impl CallbackNotificationSink {
    /// Creates a callback sink from a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Notification) -> Result<(), NotificationError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl NotificationSink for CallbackNotificationSink {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        (self.handler)(notification)
    }
}
