// worldwiki-core/src/core/identifiers.rs
// ============================================================================
// Module: Worldwiki Identifiers
// Description: Opaque identifiers for actors, public aliases, and periods.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! Actor and period identifiers are opaque string wrappers. Public IDs are
//! ten-character URL-safe tokens that alias an entity independently of its
//! hierarchical position; they are validated on parse and generated from a
//! caller-provided random source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Alphabet used for generated public IDs and period IDs.
pub const PUBLIC_ID_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz-";
/// Length of a public ID.
pub const PUBLIC_ID_LENGTH: usize = 10;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Public ID has the wrong length or alphabet.
    #[error("invalid public id: {0}")]
    InvalidPublicId(String),
}

// ============================================================================
// SECTION: Actor Identifier
// ============================================================================

/// Actor (principal) identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Creates a new actor identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Period Identifier
// ============================================================================

/// Timeline period identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(String);

impl PeriodId {
    /// Creates a new period identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random period identifier.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(random_token(rng))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PeriodId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Public Identifier
// ============================================================================

/// URL-safe public alias for an entity.
///
/// # Invariants
/// - Exactly ten characters from `0-9A-Za-z_-`.
/// - Never reused once assigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicId(String);

impl PublicId {
    /// Parses and validates a public ID.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidPublicId`] when the value is malformed.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if is_valid_public_id(&value) {
            Ok(Self(value))
        } else {
            Err(IdentifierError::InvalidPublicId(value))
        }
    }

    /// Generates a random public ID.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(random_token(rng))
    }

    /// Returns the public ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for PublicId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PublicId> for String {
    fn from(id: PublicId) -> Self {
        id.0
    }
}

/// Returns true when `value` is a well-formed public ID.
#[must_use]
pub fn is_valid_public_id(value: &str) -> bool {
    value.len() == PUBLIC_ID_LENGTH
        && value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
}

/// Draws a token of `PUBLIC_ID_LENGTH` characters from the public alphabet.
fn random_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..PUBLIC_ID_LENGTH)
        .map(|_| char::from(PUBLIC_ID_ALPHABET[rng.gen_range(0..PUBLIC_ID_ALPHABET.len())]))
        .collect()
}
