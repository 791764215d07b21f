// worldwiki-config/src/lib.rs
// ============================================================================
// Module: Worldwiki Config Library
// Description: Canonical config model and validation for Worldwiki hosts.
// Purpose: Single source of truth for worldwiki.toml semantics.
// Dependencies: worldwiki-core, worldwiki-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `worldwiki-config` defines the configuration model for Worldwiki hosts.
//! It provides strict, fail-closed validation and converters into the
//! runtime configs of the workflow engine and the `SQLite` store.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
