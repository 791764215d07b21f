// worldwiki-sinks/src/lib.rs
// ============================================================================
// Module: Worldwiki Sinks Library
// Description: Reference audit and notification sinks for Worldwiki.
// Purpose: Deliver post-commit side effects to logs, files, and channels.
// Dependencies: worldwiki-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! Worldwiki Sinks provides ready-made [`AuditSink`] and
//! [`NotificationSink`] implementations. Every sink is fire-and-forget from
//! the workflow's point of view: the engine logs failures and never rolls a
//! commit back because a sink refused an event.
//!
//! [`AuditSink`]: worldwiki_core::AuditSink
//! [`NotificationSink`]: worldwiki_core::NotificationSink

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod notify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FanoutAuditSink;
pub use audit::FileAuditSink;
pub use audit::JsonLinesAuditSink;
pub use audit::StderrAuditSink;
pub use notify::CallbackNotificationSink;
pub use notify::ChannelNotificationSink;
pub use notify::LogNotificationSink;
