// worldwiki-sinks/src/notify/mod.rs
// ============================================================================
// Module: Worldwiki Notification Sinks
// Description: Notification sink implementations.
// Purpose: Route workflow notifications to logs, channels, or callbacks.
// Dependencies: worldwiki-core
// ============================================================================

//! ## Overview
//! Notification sinks receive one [`worldwiki_core::Notification`] per
//! recipient after a workflow commit. None of them block: channel delivery
//! uses `try_send` and reports saturation instead of waiting.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod callback;
mod channel;
mod log;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use callback::CallbackNotificationSink;
pub use channel::ChannelNotificationSink;
pub use log::LogNotificationSink;
