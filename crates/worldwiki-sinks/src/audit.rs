// worldwiki-sinks/src/audit.rs
// ============================================================================
// Module: Worldwiki Audit Sinks
// Description: JSON-lines and fan-out audit sinks.
// Purpose: Persist audit events as append-only newline-delimited JSON.
// Dependencies: worldwiki-core, serde_json, std
// ============================================================================

//! ## Overview
//! [`JsonLinesAuditSink`] writes one JSON object per audit event to any
//! writer. [`FileAuditSink`] opens a file in append mode so restarts never
//! truncate history. [`StderrAuditSink`] is the fallback when no audit file
//! is configured. [`FanoutAuditSink`] forwards each event to several
//! sinks and reports the first failure after trying all of them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Stderr;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use worldwiki_core::AuditError;
use worldwiki_core::AuditEvent;
use worldwiki_core::AuditSink;

// ============================================================================
// SECTION: JSON Lines Sink
// ============================================================================

/// Audit sink writing newline-delimited JSON records.
pub struct JsonLinesAuditSink<W: Write + Send> {
    /// Output writer for audit records.
    writer: Mutex<W>,
}

/// Audit sink appending to a file.
pub type FileAuditSink = JsonLinesAuditSink<File>;

/// Audit sink writing to standard error.
pub type StderrAuditSink = JsonLinesAuditSink<Stderr>;

impl<W: Write + Send> JsonLinesAuditSink<W> {
    /// Creates a sink over the given writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] when the writer mutex is poisoned.
    pub fn into_inner(self) -> Result<W, AuditError> {
        self.writer
            .into_inner()
            .map_err(|_| AuditError::Io("audit writer mutex poisoned".to_string()))
    }
}

impl JsonLinesAuditSink<File> {
    /// Opens an append-only audit file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] when the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AuditError::Io(err.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| AuditError::Io(err.to_string()))?;
        Ok(Self::new(file))
    }
}

impl JsonLinesAuditSink<Stderr> {
    /// Creates a sink writing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> AuditSink for JsonLinesAuditSink<W> {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_vec(event).map_err(|err| AuditError::Serialization(err.to_string()))?;
        line.push(b'\n');
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| AuditError::Io("audit writer mutex poisoned".to_string()))?;
        guard.write_all(&line).map_err(|err| AuditError::Io(err.to_string()))?;
        guard.flush().map_err(|err| AuditError::Io(err.to_string()))?;
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Fan-Out Sink
// ============================================================================

/// Audit sink forwarding events to several sinks.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    /// Downstream sinks in delivery order.
    sinks: Vec<Arc<dyn AuditSink + Send + Sync>>,
}

impl FanoutAuditSink {
    /// Creates an empty fan-out sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with an extra downstream sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink + Send + Sync>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = sink.record(event) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
