// worldwiki-core/src/runtime/deep.rs
// ============================================================================
// Module: Worldwiki Deep Creation
// Description: Structural gap synthesis for skip-level child creation.
// Purpose: Keep the tree traversable by prefix when a child skips levels.
// Dependencies: crate::{core, interfaces, runtime::hierarchy}, rand
// ============================================================================

//! ## Overview
//! Creating a child more than one level below its parent inserts one gap
//! node per skipped level, each at the running HID extended with `00`.
//! Existing gaps are reused. Gaps are published nodes named
//! [`STRUCTURAL_NAME`] with `{type: "GAP"}` metadata and a seed LIVE version.
//! They belong to the owner of the parent, like the child itself, and they
//! are written in the same batch as the child proposal so the tree never
//! holds a half-built chain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;

use crate::core::ActorId;
use crate::core::ChangeKind;
use crate::core::ChangePayload;
use crate::core::Entity;
use crate::core::EntityStatus;
use crate::core::Hid;
use crate::core::HidError;
use crate::core::Level;
use crate::core::Metadata;
use crate::core::PublicId;
use crate::core::STRUCTURAL_NAME;
use crate::core::Timestamp;
use crate::core::Version;
use crate::core::VersionStatus;
use crate::interfaces::EntityStore;
use crate::interfaces::Precondition;
use crate::interfaces::WriteBatch;
use crate::interfaces::WriteOp;
use crate::runtime::hierarchy::HierarchyError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gap chain between a parent and a deeper target level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapPlan {
    /// Every gap HID on the chain, shallowest first.
    pub chain: Vec<Hid>,
    /// Gap HIDs that do not exist yet.
    pub missing: Vec<Hid>,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Plans and writes structural gap nodes.
#[derive(Debug, Clone, Copy)]
pub struct DeepCreationService<'a, S: ?Sized> {
    /// Store used to resolve existing nodes, trashed ones included.
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> DeepCreationService<'a, S> {
    /// Creates a deep-creation service over a store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Computes the gap chain between `parent` and `target`.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError`] when the target is not deeper than the
    /// parent or the store fails.
    pub fn plan(&self, parent: &Hid, target: Level) -> Result<GapPlan, HierarchyError> {
        if target <= parent.level() {
            return Err(HidError::TargetNotDeeper {
                parent: parent.level().get(),
                target: target.get(),
            }
            .into());
        }
        let mut chain = Vec::new();
        let mut missing = Vec::new();
        let mut cursor = parent.clone();
        while cursor.level().next().is_some_and(|next| next < target) {
            cursor = cursor.gap_child()?;
            if self.store.entity(&cursor)?.is_none() {
                missing.push(cursor.clone());
            }
            chain.push(cursor.clone());
        }
        Ok(GapPlan {
            chain,
            missing,
        })
    }

    /// Appends writes for every missing gap in the plan to `batch`.
    ///
    /// Gaps belong to `owner`, the owner of the subtree they are cut into.
    pub fn append_gaps<R: Rng + ?Sized>(
        &self,
        plan: &GapPlan,
        owner: Option<&ActorId>,
        batch: &mut WriteBatch,
        rng: &mut R,
        at: Timestamp,
    ) {
        for hid in &plan.missing {
            let (entity, seed) = gap_node(hid.clone(), PublicId::generate(rng), owner, at);
            batch
                .require(Precondition::EntityAbsent(hid.clone()))
                .require(Precondition::PublicIdAbsent(entity.public_id.clone()))
                .write(WriteOp::PutEntity(entity))
                .write(WriteOp::PutVersion(seed));
        }
    }
}

/// Builds a published gap entity and its seed LIVE version.
#[must_use]
pub fn gap_node(
    hid: Hid,
    public_id: PublicId,
    owner: Option<&ActorId>,
    at: Timestamp,
) -> (Entity, Version) {
    let mut entity =
        Entity::draft(hid.clone(), public_id, STRUCTURAL_NAME, "", owner.cloned(), at);
    entity.metadata = Metadata::gap();
    entity.status = EntityStatus::Live;
    entity.visibility_public = true;
    entity.current_version_number = 1;
    let seed = Version {
        hid: hid.clone(),
        version_number: 1,
        created_at: at,
        reviewed_at: Some(at),
        proposed_name: STRUCTURAL_NAME.to_string(),
        proposed_description: String::new(),
        payload: ChangePayload::Add {
            level: hid.level(),
            parent: hid.parent(),
        },
        kind: ChangeKind::Live,
        status: VersionStatus::Live,
        change_log: String::new(),
        author: owner.cloned(),
        reviewer: None,
        admin_feedback: None,
    };
    (entity, seed)
}
