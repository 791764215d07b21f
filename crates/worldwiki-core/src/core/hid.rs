// worldwiki-core/src/core/hid.rs
// ============================================================================
// Module: Worldwiki Hierarchical Identifiers
// Description: Fixed-width base-10 identifiers that encode tree level and ancestry.
// Purpose: Validate, decompose, and extend hierarchical IDs (HIDs).
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A HID is a digit string whose length determines its level. Levels 1..=15
//! use two digits per level; level 16 (the leaf level) appends a four-digit
//! segment, so the only valid lengths are 2, 4, ..., 30 and 34. Intermediate
//! levels skipped by deep creation are padded with `00` segments, which keeps
//! ancestry queries purely prefix based.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Shallowest level in the hierarchy.
pub const MIN_LEVEL: u8 = 1;
/// Deepest level in the hierarchy (leaf entities).
pub const MAX_LEVEL: u8 = 16;
/// Digit width of a segment on levels 1..=15.
pub const SEGMENT_WIDTH: usize = 2;
/// Digit width of the leaf-level segment.
pub const LEAF_SEGMENT_WIDTH: usize = 4;
/// Total HID length of a leaf-level identifier.
pub const LEAF_HID_LENGTH: usize = 34;
/// Segment used for structural gap nodes.
pub const GAP_SEGMENT: &str = "00";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hierarchical identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HidError {
    /// HID length does not map to a level.
    #[error("invalid hid length: {0}")]
    InvalidLength(usize),
    /// HID contains a non-digit character.
    #[error("hid must contain only ascii digits")]
    NonDigit,
    /// Level is outside 1..=16.
    #[error("invalid level: {0}")]
    InvalidLevel(u8),
    /// Target level is not deeper than the parent level.
    #[error("target level {target} must be deeper than parent level {parent}")]
    TargetNotDeeper {
        /// Parent level.
        parent: u8,
        /// Requested target level.
        target: u8,
    },
    /// Segment width does not match the target level.
    #[error("segment width mismatch: expected {expected} digits, got {actual}")]
    SegmentWidth {
        /// Expected digit count.
        expected: usize,
        /// Actual digit count.
        actual: usize,
    },
    /// Gap segments cannot be appended at or below the given level.
    #[error("no structural gap can follow level {0}")]
    GapBeyondLevel(u8),
}

// ============================================================================
// SECTION: Level
// ============================================================================

/// Hierarchy level derived from a HID length.
///
/// # Invariants
/// - Always within `MIN_LEVEL..=MAX_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Root level (worlds).
    pub const ROOT: Self = Self(MIN_LEVEL);
    /// Leaf level (four-digit segment).
    pub const LEAF: Self = Self(MAX_LEVEL);

    /// Creates a level from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`HidError::InvalidLevel`] when the value is outside 1..=16.
    pub const fn new(value: u8) -> Result<Self, HidError> {
        if value < MIN_LEVEL || value > MAX_LEVEL {
            return Err(HidError::InvalidLevel(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw level value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the HID length for identifiers at this level.
    #[must_use]
    pub const fn hid_length(self) -> usize {
        if self.0 == MAX_LEVEL {
            LEAF_HID_LENGTH
        } else {
            self.0 as usize * SEGMENT_WIDTH
        }
    }

    /// Returns the width of the final segment at this level.
    #[must_use]
    pub const fn segment_width(self) -> usize {
        if self.0 == MAX_LEVEL { LEAF_SEGMENT_WIDTH } else { SEGMENT_WIDTH }
    }

    /// Returns the next deeper level, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 >= MAX_LEVEL { None } else { Some(Self(self.0 + 1)) }
    }

    /// Returns true for the leaf level.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        self.0 == MAX_LEVEL
    }

    /// Maps a HID length onto its level.
    #[must_use]
    pub const fn for_length(length: usize) -> Option<Self> {
        if length == LEAF_HID_LENGTH {
            return Some(Self::LEAF);
        }
        if length == 0 || length % SEGMENT_WIDTH != 0 || length > 30 {
            return None;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "length is at most 30 so the level fits in u8"
        )]
        let level = (length / SEGMENT_WIDTH) as u8;
        Some(Self(level))
    }
}

impl TryFrom<u8> for Level {
    type Error = HidError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Hierarchical Identifier
// ============================================================================

/// Validated hierarchical identifier.
///
/// # Invariants
/// - Contains only ASCII digits.
/// - Length is one of 2, 4, ..., 30, 34.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hid(String);

impl Hid {
    /// Parses and validates a HID.
    ///
    /// # Errors
    ///
    /// Returns [`HidError`] when the value is not a valid HID.
    pub fn parse(value: impl Into<String>) -> Result<Self, HidError> {
        let value = value.into();
        level_of(&value)?;
        Ok(Self(value))
    }

    /// Returns the HID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the HID length in digits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; HIDs are never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns the level encoded by this HID.
    #[must_use]
    pub fn level(&self) -> Level {
        Level::for_length(self.0.len()).unwrap_or(Level::ROOT)
    }

    /// Returns the final segment digits.
    #[must_use]
    pub fn final_segment(&self) -> &str {
        let width = self.level().segment_width();
        &self.0[self.0.len() - width..]
    }

    /// Returns the parent HID, trimming the final segment.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.level() == Level::ROOT {
            return None;
        }
        let width = self.level().segment_width();
        Some(Self(self.0[..self.0.len() - width].to_string()))
    }

    /// Returns every ancestor HID ordered root first, parent last.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut chain = Vec::new();
        let mut cursor = self.parent();
        while let Some(hid) = cursor {
            cursor = hid.parent();
            chain.push(hid);
        }
        chain.reverse();
        chain
    }

    /// Returns true when `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Returns true when the final segment is the structural gap segment.
    #[must_use]
    pub fn has_gap_segment(&self) -> bool {
        self.level() != Level::ROOT && self.final_segment().bytes().all(|byte| byte == b'0')
    }

    /// Returns the structural gap child one level below this HID.
    ///
    /// # Errors
    ///
    /// Returns [`HidError::GapBeyondLevel`] when the next level is the leaf level.
    pub fn gap_child(&self) -> Result<Self, HidError> {
        let level = self.level();
        match level.next() {
            Some(next) if !next.is_leaf() => build_child(self, next, GAP_SEGMENT),
            _ => Err(HidError::GapBeyondLevel(level.get())),
        }
    }
}

impl fmt::Display for Hid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Hid {
    type Err = HidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Hid {
    type Error = HidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Hid {
    type Error = HidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Hid> for String {
    fn from(hid: Hid) -> Self {
        hid.0
    }
}

// ============================================================================
// SECTION: Codec Functions
// ============================================================================

/// Returns the level encoded by a raw HID string.
///
/// # Errors
///
/// Returns [`HidError`] when the string is not a valid HID.
pub fn level_of(hid: &str) -> Result<Level, HidError> {
    if !hid.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(HidError::NonDigit);
    }
    Level::for_length(hid.len()).ok_or(HidError::InvalidLength(hid.len()))
}

/// Builds a child HID at `target_level` below `parent`.
///
/// Intermediate levels between the parent and the target are padded with
/// `00` segments so the result always starts with `parent`.
///
/// # Errors
///
/// Returns [`HidError`] when the target is not deeper than the parent or the
/// segment has the wrong width or contains non-digits.
pub fn build_child(parent: &Hid, target_level: Level, segment: &str) -> Result<Hid, HidError> {
    let parent_level = parent.level();
    if target_level <= parent_level {
        return Err(HidError::TargetNotDeeper {
            parent: parent_level.get(),
            target: target_level.get(),
        });
    }
    let expected = target_level.segment_width();
    if segment.len() != expected {
        return Err(HidError::SegmentWidth {
            expected,
            actual: segment.len(),
        });
    }
    if !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(HidError::NonDigit);
    }
    let padding = target_level.hid_length() - parent.len() - expected;
    let mut value = String::with_capacity(target_level.hid_length());
    value.push_str(parent.as_str());
    value.extend(std::iter::repeat_n('0', padding));
    value.push_str(segment);
    Ok(Hid(value))
}

/// Builds a root-level HID from a two-digit segment.
///
/// # Errors
///
/// Returns [`HidError`] when the segment is not two digits.
pub fn build_root(segment: &str) -> Result<Hid, HidError> {
    if segment.len() != SEGMENT_WIDTH {
        return Err(HidError::SegmentWidth {
            expected: SEGMENT_WIDTH,
            actual: segment.len(),
        });
    }
    Hid::parse(segment)
}

/// Formats a numeric segment value with the width required by `level`.
#[must_use]
pub fn format_segment(level: Level, value: u32) -> String {
    format!("{value:0width$}", width = level.segment_width())
}

/// Returns the largest segment value representable at `level`.
#[must_use]
pub const fn max_segment_value(level: Level) -> u32 {
    if level.is_leaf() { 9_999 } else { 99 }
}
