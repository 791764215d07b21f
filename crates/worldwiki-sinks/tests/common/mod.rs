// worldwiki-sinks/tests/common/mod.rs
// ============================================================================
// Module: Sink Test Fixtures
// Description: Shared writers and sample events for sink tests.
// ============================================================================

use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::json;
use worldwiki_core::ActorId;
use worldwiki_core::AuditAction;
use worldwiki_core::AuditEvent;
use worldwiki_core::Notification;
use worldwiki_core::NotificationKind;
use worldwiki_core::Timestamp;

// ============================================================================
// SECTION: Writers
// ============================================================================

/// Cloneable in-memory writer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.to_string_lossy().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that fails every call.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }
}

// ============================================================================
// SECTION: Samples
// ============================================================================

pub fn sample_event(target: &str) -> AuditEvent {
    AuditEvent {
        actor: Some(ActorId::from("boss")),
        action: AuditAction::Publish,
        target_id: target.to_string(),
        details: json!({"version_number": 2}),
        timestamp: Timestamp::Logical(7),
    }
}

pub fn sample_notification(recipient: &str) -> Notification {
    Notification {
        recipient: ActorId::from(recipient),
        kind: NotificationKind::ProposalApproved,
        target_id: "0101".to_string(),
        version_number: Some(2),
        message: "proposal approved".to_string(),
        at: Timestamp::Logical(9),
    }
}
