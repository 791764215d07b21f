// worldwiki-core/src/core/short_code.rs
// ============================================================================
// Module: Worldwiki Short Codes
// Description: Base-62 human-facing codes for hierarchical identifiers.
// Purpose: Encode and decode short codes and compact direct-link keys.
// Dependencies: crate::core::hid, thiserror
// ============================================================================

//! ## Overview
//! Short codes interpret the ASCII bytes of a string as a big-endian integer
//! and write it in base 62 over a fixed alphabet. Codes are presentation
//! aliases only and are never used for authorization.
//!
//! Compact keys shorten direct-link HIDs (every intermediate segment `00`)
//! to `level ++ root segment ++ final segment` before encoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::hid::Hid;
use crate::core::hid::Level;
use crate::core::hid::SEGMENT_WIDTH;
use crate::core::hid::build_child;
use crate::core::hid::build_root;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed short-code alphabet (vowels, consonants, digits).
pub const ALPHABET: &str = "AEIOUaeiouBCDFGHJKLMNPQRSTVWXYZbcdfghjklmnpqrstvwxyz0123456789";
/// Numeric base of the short-code alphabet.
const BASE: u32 = 62;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Short-code encoding and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortCodeError {
    /// Input contains non-ASCII characters.
    #[error("short codes only encode ascii text")]
    NonAscii,
    /// Input begins with a NUL byte, which the integer form cannot preserve.
    #[error("short codes cannot encode a leading nul byte")]
    LeadingNul,
    /// Code contains a character outside the alphabet.
    #[error("invalid short-code character: {0:?}")]
    InvalidCharacter(char),
    /// Decoded value is not a valid identifier.
    #[error("decoded value is not a valid identifier: {0}")]
    InvalidIdentifier(String),
    /// HID has non-zero intermediate segments and cannot be compacted.
    #[error("hid {0} is not a direct-link identifier")]
    NotCompactable(String),
}

// ============================================================================
// SECTION: Text Codec
// ============================================================================

/// Encodes ASCII text as a base-62 short code.
///
/// Empty input encodes to the empty string.
///
/// # Errors
///
/// Returns [`ShortCodeError`] for non-ASCII input or a leading NUL byte.
pub fn encode_text(text: &str) -> Result<String, ShortCodeError> {
    if !text.is_ascii() {
        return Err(ShortCodeError::NonAscii);
    }
    if text.is_empty() {
        return Ok(String::new());
    }
    if text.as_bytes()[0] == 0 {
        return Err(ShortCodeError::LeadingNul);
    }
    let alphabet = ALPHABET.as_bytes();
    let mut number: Vec<u8> = text.as_bytes().to_vec();
    let mut digits = Vec::new();
    while !number.is_empty() {
        let mut quotient = Vec::with_capacity(number.len());
        let mut remainder: u32 = 0;
        for byte in &number {
            let accumulator = (remainder << 8) | u32::from(*byte);
            let digit = accumulator / BASE;
            remainder = accumulator % BASE;
            if !(quotient.is_empty() && digit == 0) {
                quotient.push(u8::try_from(digit).unwrap_or(u8::MAX));
            }
        }
        digits.push(alphabet[usize::try_from(remainder).unwrap_or(0)]);
        number = quotient;
    }
    digits.reverse();
    Ok(digits.into_iter().map(char::from).collect())
}

/// Decodes a base-62 short code back into ASCII text.
///
/// The empty code decodes to the empty string.
///
/// # Errors
///
/// Returns [`ShortCodeError`] when the code contains characters outside the
/// alphabet or decodes to non-ASCII bytes.
pub fn decode_text(code: &str) -> Result<String, ShortCodeError> {
    if code.is_empty() {
        return Ok(String::new());
    }
    let mut bytes: Vec<u8> = vec![0];
    for ch in code.chars() {
        let digit = ALPHABET.find(ch).ok_or(ShortCodeError::InvalidCharacter(ch))?;
        let mut carry = u32::try_from(digit).unwrap_or(0);
        for byte in bytes.iter_mut().rev() {
            let value = u32::from(*byte) * BASE + carry;
            *byte = u8::try_from(value & 0xff).unwrap_or(0);
            carry = value >> 8;
        }
        while carry > 0 {
            bytes.insert(0, u8::try_from(carry & 0xff).unwrap_or(0));
            carry >>= 8;
        }
    }
    while bytes.len() > 1 && bytes[0] == 0 {
        bytes.remove(0);
    }
    if !bytes.is_ascii() {
        return Err(ShortCodeError::NonAscii);
    }
    String::from_utf8(bytes).map_err(|_| ShortCodeError::NonAscii)
}

// ============================================================================
// SECTION: HID Codec
// ============================================================================

/// Encodes a HID as a short code.
#[must_use]
pub fn encode_short(hid: &Hid) -> String {
    encode_text(hid.as_str()).unwrap_or_default()
}

/// Decodes a short code into a validated HID.
///
/// # Errors
///
/// Returns [`ShortCodeError`] when the code is malformed or does not decode to
/// a valid HID.
pub fn decode_short(code: &str) -> Result<Hid, ShortCodeError> {
    let text = decode_text(code)?;
    Hid::parse(text.clone()).map_err(|_| ShortCodeError::InvalidIdentifier(text))
}

// ============================================================================
// SECTION: Compact Keys
// ============================================================================

/// Converts a direct-link HID into its compact key.
///
/// # Errors
///
/// Returns [`ShortCodeError::NotCompactable`] when an intermediate segment is
/// not `00`.
pub fn to_compact_key(hid: &Hid) -> Result<String, ShortCodeError> {
    let level = hid.level();
    let root = &hid.as_str()[..SEGMENT_WIDTH];
    if level == Level::ROOT {
        return Ok(format!("{:02}{root}", level.get()));
    }
    let segment = hid.final_segment();
    let middle = &hid.as_str()[SEGMENT_WIDTH..hid.len() - segment.len()];
    if middle.bytes().any(|byte| byte != b'0') {
        return Err(ShortCodeError::NotCompactable(hid.to_string()));
    }
    Ok(format!("{:02}{root}{segment}", level.get()))
}

/// Rebuilds a HID from a compact key.
///
/// # Errors
///
/// Returns [`ShortCodeError::InvalidIdentifier`] when the key is malformed.
pub fn from_compact_key(key: &str) -> Result<Hid, ShortCodeError> {
    let invalid = || ShortCodeError::InvalidIdentifier(key.to_string());
    let level_digits = key.get(..2).ok_or_else(invalid)?;
    let level_value: u8 = level_digits.parse().map_err(|_| invalid())?;
    let level = Level::new(level_value).map_err(|_| invalid())?;
    let root_digits = key.get(2..2 + SEGMENT_WIDTH).ok_or_else(invalid)?;
    let root = build_root(root_digits).map_err(|_| invalid())?;
    if level == Level::ROOT {
        return if key.len() == 2 + SEGMENT_WIDTH { Ok(root) } else { Err(invalid()) };
    }
    let segment = key.get(2 + SEGMENT_WIDTH..).ok_or_else(invalid)?;
    build_child(&root, level, segment).map_err(|_| invalid())
}

/// Encodes a direct-link HID as a compact short code.
///
/// # Errors
///
/// Returns [`ShortCodeError::NotCompactable`] for non-direct HIDs.
pub fn encode_compact(hid: &Hid) -> Result<String, ShortCodeError> {
    encode_text(&to_compact_key(hid)?)
}

/// Decodes a compact short code into a HID.
///
/// # Errors
///
/// Returns [`ShortCodeError`] when the code or its compact key is malformed.
pub fn decode_compact(code: &str) -> Result<Hid, ShortCodeError> {
    from_compact_key(&decode_text(code)?)
}
