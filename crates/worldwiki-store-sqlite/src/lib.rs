// worldwiki-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Wiki Store
// Description: Durable WikiStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for Worldwiki content.
// Dependencies: worldwiki-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`WikiStore`] implementation with
//! atomic batch commits, policy filters compiled to SQL, and an append-only
//! audit log. Security posture: storage inputs are untrusted and loads fail
//! closed on malformed records.
//!
//! [`WikiStore`]: worldwiki_core::WikiStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RECORD_BYTES;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteWikiStore;
