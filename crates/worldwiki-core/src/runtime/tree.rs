// worldwiki-core/src/runtime/tree.rs
// ============================================================================
// Module: Worldwiki Ghost Solidification
// Description: Child selection for detail views over trees with structural gaps.
// Purpose: Hoist real descendants past empty gaps while keeping prefix storage.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A node is solid when it is a real (non-gap) entity; solidity propagates to
//! every ancestor. A node is transparent when it is a gap without a solid
//! descendant, or when it is absent from the visible set. A descendant is
//! shown below a parent when it is not transparent and every node strictly
//! between them is transparent, which hoists real leaves up to their nearest
//! real ancestor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::Entity;
use crate::core::Hid;

// ============================================================================
// SECTION: Solidification
// ============================================================================

/// Returns the descendants of `parent` to display as its children.
///
/// `descendants` should hold the visible descendants of `parent`; entries
/// outside the subtree are ignored. Output is ordered by HID.
#[must_use]
pub fn visible_children<'e>(parent: &Hid, descendants: &'e [Entity]) -> Vec<&'e Entity> {
    let nodes: BTreeMap<&Hid, &Entity> = descendants
        .iter()
        .filter(|entity| parent.is_ancestor_of(&entity.hid))
        .map(|entity| (&entity.hid, entity))
        .collect();
    let mut solid: BTreeSet<Hid> = BTreeSet::new();
    for entity in nodes.values().filter(|entity| !entity.is_gap()) {
        solid.insert(entity.hid.clone());
        for ancestor in entity.hid.ancestors() {
            if parent.is_ancestor_of(&ancestor) {
                solid.insert(ancestor);
            }
        }
    }
    let transparent = |hid: &Hid| !nodes.contains_key(hid) || !solid.contains(hid);
    nodes
        .values()
        .filter(|entity| !transparent(&entity.hid))
        .filter(|entity| {
            entity
                .hid
                .ancestors()
                .iter()
                .filter(|ancestor| parent.is_ancestor_of(ancestor))
                .all(|ancestor| transparent(ancestor))
        })
        .copied()
        .collect()
}
