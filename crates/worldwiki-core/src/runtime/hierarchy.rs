// worldwiki-core/src/runtime/hierarchy.rs
// ============================================================================
// Module: Worldwiki Hierarchy Repository
// Description: Prefix-structured entity queries and identifier allocation.
// Purpose: Resolve ancestry, descendants, and the next free HID below a parent.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! The hierarchy repository layers tree semantics over an [`EntityStore`].
//! Ancestry comes from HID parsing rather than substring matching, and
//! sibling allocation scans the subtree below the parent's padded prefix,
//! reading each node's segment at the target width. Trashed entities and any
//! deeper node still reserve their slot, so a HID is never handed out twice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Entity;
use crate::core::Hid;
use crate::core::HidError;
use crate::core::Level;
use crate::core::PublicId;
use crate::core::hid::build_child;
use crate::core::hid::build_root;
use crate::core::hid::format_segment;
use crate::core::hid::max_segment_value;
use crate::interfaces::EntityQuery;
use crate::interfaces::EntityStore;
use crate::interfaces::Precondition;
use crate::interfaces::StoreError;
use crate::interfaces::TrashScope;
use crate::interfaces::WikiStore;
use crate::interfaces::WriteBatch;
use crate::interfaces::WriteOp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hierarchy repository errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// Identifier codec failure.
    #[error(transparent)]
    Hid(#[from] HidError),
    /// Parent entity does not exist.
    #[error("unknown parent: {0}")]
    UnknownParent(Hid),
    /// An entity already exists at the HID.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(Hid),
    /// Every segment value at the level is taken.
    #[error("no free identifier at level {level}")]
    Exhausted {
        /// Parent HID (`None` for root allocation).
        parent: Option<Hid>,
        /// Target level.
        level: Level,
    },
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Metadata property resolved through the ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedProperty {
    /// Property key.
    pub key: String,
    /// Property value.
    pub value: String,
    /// Entity the value comes from.
    pub source: Hid,
    /// True when the value comes from an ancestor.
    pub inherited: bool,
}

// ============================================================================
// SECTION: Repository
// ============================================================================

/// Tree-structured view over a wiki store.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyRepository<'a, S: ?Sized> {
    /// Backing store.
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> HierarchyRepository<'a, S> {
    /// Creates a repository over a store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Loads an active entity.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Store`] when loading fails.
    pub fn get(&self, hid: &Hid) -> Result<Option<Entity>, HierarchyError> {
        Ok(self.store.entity(hid)?.filter(|entity| entity.is_active))
    }

    /// Loads an active entity by public ID.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Store`] when loading fails.
    pub fn get_by_public_id(
        &self,
        public_id: &PublicId,
    ) -> Result<Option<Entity>, HierarchyError> {
        Ok(self.store.entity_by_public_id(public_id)?.filter(|entity| entity.is_active))
    }

    /// Returns the next free child HID below `parent` at `target_level`.
    ///
    /// The level defaults to the level directly below the parent.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::UnknownParent`] when the parent is not an
    /// active entity and [`HierarchyError::Exhausted`] when every segment at
    /// the level is taken.
    pub fn next_child_id(
        &self,
        parent: &Hid,
        target_level: Option<Level>,
    ) -> Result<Hid, HierarchyError> {
        if self.get(parent)?.is_none() {
            return Err(HierarchyError::UnknownParent(parent.clone()));
        }
        let level = match target_level {
            Some(level) => level,
            None => parent.level().next().ok_or(HidError::TargetNotDeeper {
                parent: parent.level().get(),
                target: parent.level().get(),
            })?,
        };
        let first = build_child(parent, level, &format_segment(level, 0))?;
        let sibling_prefix = first.parent().unwrap_or_else(|| parent.clone());
        let subtree = self.store.query_entities(
            &EntityQuery::active().with_prefix(sibling_prefix).with_scope(TrashScope::Any),
        )?;
        let next = next_segment(&subtree, level).ok_or_else(|| HierarchyError::Exhausted {
            parent: Some(parent.clone()),
            level,
        })?;
        Ok(build_child(parent, level, &format_segment(level, next))?)
    }

    /// Returns the next free root-level HID.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Exhausted`] when every root segment is taken.
    pub fn next_root_id(&self) -> Result<Hid, HierarchyError> {
        let all = self.store.query_entities(&EntityQuery::active().with_scope(TrashScope::Any))?;
        let next = next_segment(&all, Level::ROOT).ok_or(HierarchyError::Exhausted {
            parent: None,
            level: Level::ROOT,
        })?;
        Ok(build_root(&format_segment(Level::ROOT, next))?)
    }

    /// Lists active entities whose HID starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Store`] when the query fails.
    pub fn by_prefix(
        &self,
        prefix: &Hid,
        length: Option<usize>,
    ) -> Result<Vec<Entity>, HierarchyError> {
        let mut query = EntityQuery::active().with_prefix(prefix.clone());
        query.length = length;
        Ok(self.store.query_entities(&query)?)
    }

    /// Returns the existing active ancestors of `hid`, root first.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Store`] when loading fails.
    pub fn ancestors(&self, hid: &Hid) -> Result<Vec<Entity>, HierarchyError> {
        let mut chain = Vec::new();
        for ancestor in hid.ancestors() {
            if let Some(entity) = self.get(&ancestor)? {
                chain.push(entity);
            }
        }
        Ok(chain)
    }

    /// Returns active descendants of `hid`, optionally restricted to one level.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Store`] when the query fails.
    pub fn descendants(
        &self,
        hid: &Hid,
        level: Option<Level>,
    ) -> Result<Vec<Entity>, HierarchyError> {
        let mut entities = self.by_prefix(hid, level.map(Level::hid_length))?;
        entities.retain(|entity| entity.hid != *hid);
        Ok(entities)
    }

    /// Returns local properties followed by properties inherited from
    /// ancestors; local values win, then the nearest ancestor.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Store`] when loading fails.
    pub fn inherited_properties(
        &self,
        hid: &Hid,
    ) -> Result<Vec<InheritedProperty>, HierarchyError> {
        let mut resolved: Vec<InheritedProperty> = Vec::new();
        let local = self.get(hid)?;
        let mut chain: Vec<(Entity, bool)> =
            local.into_iter().map(|entity| (entity, false)).collect();
        chain.extend(self.ancestors(hid)?.into_iter().rev().map(|entity| (entity, true)));
        for (entity, inherited) in chain {
            for property in entity.metadata.properties {
                if resolved.iter().any(|existing| existing.key == property.key) {
                    continue;
                }
                resolved.push(InheritedProperty {
                    key: property.key,
                    value: property.value,
                    source: entity.hid.clone(),
                    inherited,
                });
            }
        }
        Ok(resolved)
    }
}

impl<S: WikiStore + ?Sized> HierarchyRepository<'_, S> {
    /// Persists a new entity.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DuplicateIdentifier`] when the HID is taken.
    pub fn save(&self, entity: &Entity) -> Result<(), HierarchyError> {
        let mut batch = WriteBatch::new();
        batch
            .require(Precondition::EntityAbsent(entity.hid.clone()))
            .require(Precondition::PublicIdAbsent(entity.public_id.clone()))
            .write(WriteOp::PutEntity(entity.clone()));
        match self.store.commit(&batch) {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict(_)) if self.store.entity(&entity.hid)?.is_some() => {
                Err(HierarchyError::DuplicateIdentifier(entity.hid.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the segment after the largest `level` segment used in `nodes`.
///
/// Deeper nodes count through the segment they carry at `level`, so an
/// orphaned subtree keeps its slot reserved.
fn next_segment(nodes: &[Entity], level: Level) -> Option<u32> {
    let end = level.hid_length();
    let start = end - level.segment_width();
    let highest = nodes
        .iter()
        .filter_map(|entity| entity.hid.as_str().get(start .. end)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    let next = highest + 1;
    (next <= max_segment_value(level)).then_some(next)
}
