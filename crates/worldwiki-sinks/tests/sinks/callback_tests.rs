// worldwiki-sinks/tests/sinks/callback_tests.rs
// ============================================================================
// Module: Callback Notification Sink Unit Tests
// Description: Tests for the handler-backed notification sink.
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use worldwiki_core::NotificationError;
use worldwiki_core::NotificationSink;
use worldwiki_sinks::CallbackNotificationSink;

use super::common::sample_notification;

#[test]
fn callback_sink_invokes_handler() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&seen);
    let sink = CallbackNotificationSink::new(move |notification| {
        captured.lock().unwrap().push(notification.recipient.to_string());
        Ok(())
    });

    sink.notify(&sample_notification("minion")).unwrap();
    sink.notify(&sample_notification("boss")).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["minion".to_string(), "boss".to_string()]);
}

#[test]
fn callback_sink_propagates_handler_errors() {
    let sink = CallbackNotificationSink::new(|_| Err(NotificationError::Closed));

    let result = sink.notify(&sample_notification("minion"));

    assert!(matches!(result, Err(NotificationError::Closed)));
}
