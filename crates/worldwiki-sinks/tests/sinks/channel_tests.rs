// worldwiki-sinks/tests/sinks/channel_tests.rs
// ============================================================================
// Module: Channel Notification Sink Unit Tests
// Description: Tests for the mpsc-backed notification sink.
// ============================================================================

use tokio::sync::mpsc;
use worldwiki_core::NotificationError;
use worldwiki_core::NotificationSink;
use worldwiki_sinks::ChannelNotificationSink;

use super::common::sample_notification;

#[tokio::test]
async fn channel_sink_enqueues_notification() {
    let (sender, mut receiver) = mpsc::channel(4);
    let sink = ChannelNotificationSink::new(sender);

    sink.notify(&sample_notification("minion")).expect("notify");

    let received = receiver.recv().await.expect("message");
    assert_eq!(received, sample_notification("minion"));
}

#[test]
fn channel_sink_reports_full_channel() {
    let (sender, _receiver) = mpsc::channel(1);
    let sink = ChannelNotificationSink::new(sender);

    sink.notify(&sample_notification("a")).expect("first fits");
    let result = sink.notify(&sample_notification("b"));

    assert!(matches!(result, Err(NotificationError::Full)));
}

#[test]
fn channel_sink_reports_closed_channel() {
    let (sender, receiver) = mpsc::channel(1);
    drop(receiver);
    let sink = ChannelNotificationSink::new(sender);

    let result = sink.notify(&sample_notification("a"));

    assert!(matches!(result, Err(NotificationError::Closed)));
}
