// worldwiki-core/src/core/period.rs
// ============================================================================
// Module: Worldwiki Timeline Periods
// Description: Named timeline slices of an entity and their proposals.
// Purpose: Model periods, period versions, and slug derivation.
// Dependencies: crate::core, serde, unicode-normalization
// ============================================================================

//! ## Overview
//! A [`TimelinePeriod`] is a named slice of an entity's history with its own
//! description, metadata, and proposal chain. Every period starts with a seed
//! version numbered `-1` in APPROVED status so user proposals start at `0`.
//!
//! Slugs fold Unicode titles to ASCII with NFKD decomposition, lowercase the
//! result, and join words with hyphens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::core::hid::Hid;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::PeriodId;
use crate::core::metadata::Metadata;
use crate::core::time::Timestamp;
use crate::core::version::Action;
use crate::core::version::Proposal;
use crate::core::version::VersionStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version number of the seed version created with every period.
pub const SEED_VERSION_NUMBER: i64 = -1;
/// Slug used when a title folds to nothing.
pub const FALLBACK_SLUG: &str = "period";

// ============================================================================
// SECTION: Period
// ============================================================================

/// Named timeline slice attached to an entity.
///
/// # Invariants
/// - `slug` is unique per entity.
/// - At most one period per entity has `is_current == true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePeriod {
    /// Period identity.
    pub id: PeriodId,
    /// Owning entity.
    pub hid: Hid,
    /// Display title.
    pub title: String,
    /// URL slug, unique per entity.
    pub slug: String,
    /// Display order.
    pub order: i64,
    /// Whether this is the entity's current period.
    pub is_current: bool,
    /// Whether this period lies in the future.
    pub is_future: bool,
    /// Period description.
    pub description: String,
    /// Period metadata.
    pub metadata: Metadata,
    /// Last published version number.
    pub current_version_number: i64,
    /// Optimistic-concurrency revision.
    pub revision: u64,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

// ============================================================================
// SECTION: Period Version
// ============================================================================

/// Proposal or snapshot against a timeline period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodVersion {
    /// Period the version belongs to.
    pub period_id: PeriodId,
    /// Entity owning the period.
    pub hid: Hid,
    /// Version number (seed is `-1`).
    pub version_number: i64,
    /// Proposed title.
    pub proposed_title: String,
    /// Proposed description.
    pub proposed_description: String,
    /// Proposed metadata.
    pub proposed_metadata: Metadata,
    /// Proposal action (ADD for the seed, EDIT or DELETE afterwards).
    pub action: Action,
    /// Workflow status.
    pub status: VersionStatus,
    /// Author rationale.
    #[serde(default)]
    pub change_log: String,
    /// Proposing actor.
    #[serde(default)]
    pub author: Option<ActorId>,
    /// Reviewing actor.
    #[serde(default)]
    pub reviewer: Option<ActorId>,
    /// Review timestamp.
    #[serde(default)]
    pub reviewed_at: Option<Timestamp>,
    /// Reviewer feedback.
    #[serde(default)]
    pub admin_feedback: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl Proposal for PeriodVersion {
    fn proposer(&self) -> Option<&ActorId> {
        self.author.as_ref()
    }

    fn proposal_status(&self) -> VersionStatus {
        self.status
    }
}

// ============================================================================
// SECTION: Slugs
// ============================================================================

/// Folds a title into a lowercase, ASCII, hyphen-separated slug.
///
/// Returns [`FALLBACK_SLUG`] when nothing survives folding.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;
    for ch in title.nfkd().filter(char::is_ascii) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_whitespace() || ch == '-' {
            pending_separator = true;
        }
    }
    let trimmed = slug.trim_matches(|ch| ch == '-' || ch == '_');
    if trimmed.is_empty() { FALLBACK_SLUG.to_string() } else { trimmed.to_string() }
}

/// Returns `base` or `base-N` with the smallest free `N >= 1`.
#[must_use]
pub fn unique_slug(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{base}-{counter}");
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
