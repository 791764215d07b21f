// worldwiki-sinks/tests/sinks/audit_tests.rs
// ============================================================================
// Module: Audit Sink Unit Tests
// Description: Tests for JSON-lines, file, and fan-out audit sinks.
// ============================================================================

use std::sync::Arc;

use tempfile::TempDir;
use worldwiki_core::AuditError;
use worldwiki_core::AuditEvent;
use worldwiki_core::AuditSink;
use worldwiki_core::InMemoryAuditLog;
use worldwiki_sinks::FanoutAuditSink;
use worldwiki_sinks::FileAuditSink;
use worldwiki_sinks::JsonLinesAuditSink;

use super::common::FailingWriter;
use super::common::SharedBuffer;
use super::common::sample_event;

// ============================================================================
// SECTION: JSON Lines
// ============================================================================

#[test]
fn json_lines_sink_writes_one_record_per_event() {
    let buffer = SharedBuffer::new();
    let sink = JsonLinesAuditSink::new(buffer.clone());

    sink.record(&sample_event("01")).expect("record");
    sink.record(&sample_event("0101")).expect("record");

    let lines = buffer.lines();
    assert_eq!(lines.len(), 2);
    let decoded: AuditEvent = serde_json::from_str(&lines[1]).expect("parse event");
    assert_eq!(decoded, sample_event("0101"));
}

#[test]
fn json_lines_sink_uses_canonical_action_labels() {
    let buffer = SharedBuffer::new();
    let sink = JsonLinesAuditSink::new(buffer.clone());

    sink.record(&sample_event("01")).expect("record");

    let record: serde_json::Value = serde_json::from_str(&buffer.to_string_lossy()).unwrap();
    assert_eq!(record["action"], "PUBLISH");
    assert_eq!(record["target_id"], "01");
}

#[test]
fn json_lines_sink_reports_io_failure() {
    let sink = JsonLinesAuditSink::new(FailingWriter);

    let result = sink.record(&sample_event("01"));

    assert!(matches!(result, Err(AuditError::Io(_))));
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

#[test]
fn file_sink_appends_across_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("logs").join("audit.jsonl");

    FileAuditSink::open(&path).unwrap().record(&sample_event("01")).unwrap();
    FileAuditSink::open(&path).unwrap().record(&sample_event("02")).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let targets: Vec<String> = contents
        .lines()
        .map(|line| serde_json::from_str::<AuditEvent>(line).unwrap().target_id)
        .collect();
    assert_eq!(targets, vec!["01", "02"]);
}

// ============================================================================
// SECTION: Fan-Out
// ============================================================================

#[test]
fn fanout_sink_delivers_to_every_sink_despite_failures() {
    let memory = Arc::new(InMemoryAuditLog::new());
    let sink = FanoutAuditSink::new()
        .with_sink(Arc::new(JsonLinesAuditSink::new(FailingWriter)))
        .with_sink(memory.clone());

    let result = sink.record(&sample_event("01"));

    assert!(matches!(result, Err(AuditError::Io(_))));
    assert_eq!(memory.events().len(), 1);
}

#[test]
fn empty_fanout_sink_accepts_events() {
    assert!(FanoutAuditSink::new().record(&sample_event("01")).is_ok());
}
