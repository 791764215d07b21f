// worldwiki-core/src/core/time.rs
// ============================================================================
// Module: Worldwiki Time Model
// Description: Canonical timestamp representation for versions, periods, and audit.
// Purpose: Keep workflow records replayable by never reading wall-clock time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Worldwiki records carry explicit timestamps supplied by the host with each
//! request. The core never reads wall-clock time; hosts stamp requests with
//! unix milliseconds in production and logical ticks in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in entity, version, period, and audit records.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - Ordering compares within a kind; unix values order before logical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns `self`, raised to `floor` when it is earlier.
    #[must_use]
    pub fn at_least(self, floor: Self) -> Self {
        if self < floor { floor } else { self }
    }
}
