// worldwiki-core/src/core/metadata.rs
// ============================================================================
// Module: Worldwiki Entity Metadata
// Description: Canonical metadata shape and legacy-shape normalization.
// Purpose: Persist one metadata shape while accepting historical inputs.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Metadata is persisted only in its canonical form: an ordered list of
//! `{key, value}` properties plus the reserved `cover_image` and `type`
//! markers. [`Metadata::normalize`] is the read-boundary adapter that accepts
//! the canonical object, a bare property list, flat maps, and maps nested
//! under `datos_nucleo` / `datos_extendidos`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved key for the node-kind marker.
const TYPE_KEY: &str = "type";
/// Reserved key for the cover image filename.
const COVER_IMAGE_KEY: &str = "cover_image";
/// Canonical property list key.
const PROPERTIES_KEY: &str = "properties";
/// Legacy nested maps folded into the property list, in order.
const LEGACY_NESTED_KEYS: [&str; 2] = ["datos_nucleo", "datos_extendidos"];
/// Legacy spelling of the gap marker.
const LEGACY_GAP_MARKER: &str = "STRUCTURE_GAP";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metadata normalization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Metadata is not an object or property list.
    #[error("metadata must be an object or a property list")]
    NotAnObject,
    /// A property entry is malformed.
    #[error("malformed metadata property: {0}")]
    MalformedProperty(String),
    /// A property key is empty.
    #[error("metadata property keys must be non-empty")]
    EmptyKey,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structural marker distinguishing placeholder nodes from real entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Structural gap inserted by deep creation.
    #[serde(rename = "GAP")]
    Gap,
}

/// Single canonical metadata property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property key (non-empty).
    pub key: String,
    /// Property value rendered as text.
    pub value: String,
}

impl Property {
    /// Creates a property.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Canonical entity metadata.
///
/// # Invariants
/// - Property keys are non-empty and unique.
/// - Legacy shapes never appear in persisted values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Node-kind marker (`{"type": "GAP"}` for structural gaps).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
    /// Cover image filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Ordered property list.
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Metadata {
    /// Returns the metadata used for structural gap nodes.
    #[must_use]
    pub const fn gap() -> Self {
        Self {
            node_kind: Some(NodeKind::Gap),
            cover_image: None,
            properties: Vec::new(),
        }
    }

    /// Returns true when this metadata marks a structural gap.
    #[must_use]
    pub fn is_gap(&self) -> bool {
        self.node_kind == Some(NodeKind::Gap)
    }

    /// Returns the value for a property key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.iter().find(|property| property.key == key).map(|p| p.value.as_str())
    }

    /// Inserts or replaces a property, keeping first-seen ordering.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.properties.iter_mut().find(|property| property.key == key) {
            existing.value = value;
        } else {
            self.properties.push(Property {
                key,
                value,
            });
        }
    }

    /// Replaces the property list, keeping reserved markers.
    pub fn replace_properties(&mut self, properties: Vec<Property>) {
        self.properties = properties;
    }

    /// Normalizes any accepted metadata shape into the canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the value is not an accepted shape or a
    /// property key is empty.
    pub fn normalize(value: &Value) -> Result<Self, MetadataError> {
        let mut metadata = Self::default();
        match value {
            Value::Null => {}
            Value::Array(entries) => metadata.absorb_property_list(entries)?,
            Value::Object(map) => metadata.absorb_object(map)?,
            _ => return Err(MetadataError::NotAnObject),
        }
        Ok(metadata)
    }

    /// Folds an object-shaped metadata value into `self`.
    fn absorb_object(&mut self, map: &Map<String, Value>) -> Result<(), MetadataError> {
        if let Some(kind) = map.get(TYPE_KEY).and_then(Value::as_str)
            && (kind == "GAP" || kind == LEGACY_GAP_MARKER)
        {
            self.node_kind = Some(NodeKind::Gap);
        }
        if let Some(cover) = map.get(COVER_IMAGE_KEY).and_then(Value::as_str) {
            self.cover_image = Some(cover.to_string());
        }
        if let Some(list) = map.get(PROPERTIES_KEY) {
            let Value::Array(entries) = list else {
                return Err(MetadataError::MalformedProperty(PROPERTIES_KEY.to_string()));
            };
            self.absorb_property_list(entries)?;
        }
        for nested_key in LEGACY_NESTED_KEYS {
            if let Some(Value::Object(nested)) = map.get(nested_key) {
                for (key, value) in nested {
                    self.absorb_pair(key, value)?;
                }
            }
        }
        for (key, value) in map {
            let reserved = key == TYPE_KEY
                || key == COVER_IMAGE_KEY
                || key == PROPERTIES_KEY
                || LEGACY_NESTED_KEYS.contains(&key.as_str());
            if !reserved {
                self.absorb_pair(key, value)?;
            }
        }
        Ok(())
    }

    /// Folds a canonical `[{key, value}]` list into `self`.
    fn absorb_property_list(&mut self, entries: &[Value]) -> Result<(), MetadataError> {
        for entry in entries {
            let key = entry
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| MetadataError::MalformedProperty(entry.to_string()))?;
            let value = entry.get("value").unwrap_or(&Value::Null);
            self.absorb_pair(key, value)?;
        }
        Ok(())
    }

    /// Adds one key/value pair after validation.
    fn absorb_pair(&mut self, key: &str, value: &Value) -> Result<(), MetadataError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(MetadataError::EmptyKey);
        }
        self.set_property(key, value_text(value));
        Ok(())
    }
}

/// Renders a JSON value as property text.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
