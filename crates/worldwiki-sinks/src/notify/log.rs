// worldwiki-sinks/src/notify/log.rs
// ============================================================================
// Module: Worldwiki Log Notification Sink
// Description: Log-only sink for notification records.
// Purpose: Record notifications without delivering them to users.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! `LogNotificationSink` writes a JSON record for each notification. It does
//! not deliver anything to external systems.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde_json::json;
use worldwiki_core::Notification;
use worldwiki_core::NotificationError;
use worldwiki_core::NotificationSink;

// ============================================================================
// SECTION: Log Sink
// ============================================================================

/// Log-only notification sink.
pub struct LogNotificationSink<W: Write + Send> {
    /// Output writer for log records.
    writer: Mutex<W>,
}

impl<W: Write + Send> LogNotificationSink<W> {
    /// Creates a log sink over the given writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Io`] when the writer mutex is poisoned.
    pub fn into_inner(self) -> Result<W, NotificationError> {
        self.writer
            .into_inner()
            .map_err(|_| NotificationError::Io("log writer mutex poisoned".to_string()))
    }
}

impl<W: Write + Send> NotificationSink for LogNotificationSink<W> {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        let record = json!({
            "recipient": notification.recipient,
            "kind": notification.kind,
            "target_id": notification.target_id,
            "version_number": notification.version_number,
            "message": notification.message,
            "at": notification.at,
        });
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| NotificationError::Io("log writer mutex poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, &record)
            .map_err(|err| NotificationError::Serialization(err.to_string()))?;
        guard.write_all(b"\n").map_err(|err| NotificationError::Io(err.to_string()))?;
        drop(guard);
        Ok(())
    }
}
