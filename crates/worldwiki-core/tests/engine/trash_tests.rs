// worldwiki-core/tests/engine/trash_tests.rs
// ============================================================================
// Module: Trash Tests
// Description: Soft delete, restore, trash listing, and hard delete.
// ============================================================================

//! Soft deletion and trash management tests.

use worldwiki_core::ChildRequest;
use worldwiki_core::Entity;
use worldwiki_core::EntityStatus;
use worldwiki_core::EntityStore;
use worldwiki_core::ErrorKind;
use worldwiki_core::HierarchyRepository;
use worldwiki_core::NewPeriod;
use worldwiki_core::PeriodStore;
use worldwiki_core::TransitionError;
use worldwiki_core::VersionStore;

use crate::common::Fixture;
use crate::common::MINION;
use crate::common::OUTSIDER;
use crate::common::OWNER;
use crate::common::ROOT;

/// Creates a world and publishes a minion's delete proposal against it.
fn trashed_world() -> (Fixture, Entity) {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let proposal = fx.engine.propose_delete(&fx.ctx(MINION), &world.hid, "obsolete").unwrap();
    fx.approve_and_publish(OWNER, &world.hid, proposal.version_number);
    (fx, world)
}

#[test]
fn published_delete_moves_entity_to_trash() {
    let (fx, world) = trashed_world();
    let entity = fx.entity(&world.hid);
    assert!(!entity.is_active);
    assert_eq!(entity.status, EntityStatus::Deleted);
    assert!(entity.deleted_at.is_some());

    for ctx in [fx.anonymous(), fx.ctx(MINION), fx.ctx(OWNER)] {
        let err = fx.engine.get_entity(&ctx, &world.hid).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert!(fx.engine.list(&fx.ctx(OWNER), None, None).unwrap().is_empty());
}

#[test]
fn trash_is_listed_only_to_owner_and_superuser() {
    let (fx, world) = trashed_world();
    let owned = fx.engine.trash(&fx.ctx(OWNER)).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].hid, world.hid);
    assert_eq!(fx.engine.trash(&fx.ctx(ROOT)).unwrap().len(), 1);
    assert!(fx.engine.trash(&fx.ctx(MINION)).unwrap().is_empty());
    assert!(fx.engine.trash(&fx.ctx(OUTSIDER)).unwrap().is_empty());
    assert!(fx.engine.trash(&fx.anonymous()).unwrap().is_empty());
}

#[test]
fn trashed_entities_refuse_ordinary_proposals() {
    let (fx, world) = trashed_world();
    let err = fx.engine.propose_edit(&fx.ctx(OWNER), &world.hid, "Bar", "", "").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::AlreadyTrashed));
    let err = fx.engine.propose_delete(&fx.ctx(OWNER), &world.hid, "").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::AlreadyTrashed));
    let err = fx.engine.propose_edit(&fx.ctx(MINION), &world.hid, "Bar", "", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn restore_proposal_brings_entity_back() {
    let (fx, world) = trashed_world();
    let err = fx.engine.propose_restore(&fx.ctx(MINION), &world.hid, "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let proposal = fx.engine.propose_restore(&fx.ctx(OWNER), &world.hid, "undo").unwrap();
    fx.approve_and_publish(OWNER, &world.hid, proposal.version_number);
    let entity = fx.entity(&world.hid);
    assert!(entity.is_active);
    assert_eq!(entity.status, EntityStatus::Live);
    assert_eq!(entity.deleted_at, None);
    assert!(fx.engine.get_entity(&fx.anonymous(), &world.hid).is_ok());
    assert!(fx.engine.trash(&fx.ctx(OWNER)).unwrap().is_empty());

    let err = fx.engine.propose_restore(&fx.ctx(OWNER), &world.hid, "").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotTrashed));
}

#[test]
fn hard_delete_requires_trash_and_removes_everything() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    fx.engine
        .periods()
        .create_period(&fx.ctx(OWNER), &world.hid, &NewPeriod::new("Age of Ash", ""))
        .unwrap();
    let err = fx.engine.hard_delete(&fx.ctx(OWNER), &world.hid).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotTrashed));

    let proposal = fx.engine.propose_delete(&fx.ctx(OWNER), &world.hid, "").unwrap();
    fx.approve_and_publish(OWNER, &world.hid, proposal.version_number);
    let err = fx.engine.hard_delete(&fx.ctx(MINION), &world.hid).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    fx.engine.hard_delete(&fx.ctx(OWNER), &world.hid).unwrap();
    assert!(fx.store.entity(&world.hid).unwrap().is_none());
    assert!(fx.store.versions(&world.hid).unwrap().is_empty());
    assert!(fx.store.periods(&world.hid).unwrap().is_empty());
    let audited = fx.audit.events_for(world.hid.as_str());
    assert_eq!(audited.last().map(|event| event.action.as_str()), Some("DELETE"));
}

#[test]
fn trashed_siblings_keep_their_segment() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let harbor = fx.child(OWNER, &world.hid, "Harbor");
    let proposal = fx.engine.propose_delete(&fx.ctx(OWNER), &harbor.hid, "").unwrap();
    fx.approve_and_publish(OWNER, &harbor.hid, proposal.version_number);

    let next = HierarchyRepository::new(&fx.store).next_child_id(&world.hid, None).unwrap();
    assert_eq!(next.as_str(), "0102");
    let quay = fx.child(OWNER, &world.hid, "Quay");
    assert_eq!(quay.hid, next);
}

#[test]
fn hard_delete_refuses_nodes_with_descendants() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let region = fx.child(OWNER, &world.hid, "Marches");
    let city = fx.child(OWNER, &region.hid, "Old City");
    let proposal = fx.engine.propose_delete(&fx.ctx(OWNER), &region.hid, "").unwrap();
    fx.approve_and_publish(OWNER, &region.hid, proposal.version_number);

    let err = fx.engine.hard_delete(&fx.ctx(OWNER), &region.hid).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::HasDescendants));
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert!(fx.store.entity(&region.hid).unwrap().is_some());

    let created = fx
        .engine
        .propose_child(&fx.ctx(OWNER), &ChildRequest::under(world.hid.clone(), "New", ""))
        .unwrap();
    assert_eq!(created.entity.hid.as_str(), "0102");
    assert_eq!(fx.entity(&city.hid).name, "Old City");
}

#[test]
fn hard_delete_succeeds_once_subtree_is_gone() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let region = fx.child(OWNER, &world.hid, "Marches");
    let city = fx.child(OWNER, &region.hid, "Old City");
    for hid in [&city.hid, &region.hid] {
        let proposal = fx.engine.propose_delete(&fx.ctx(OWNER), hid, "").unwrap();
        fx.approve_and_publish(OWNER, hid, proposal.version_number);
    }
    let err = fx.engine.hard_delete(&fx.ctx(OWNER), &region.hid).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::HasDescendants));

    fx.engine.hard_delete(&fx.ctx(OWNER), &city.hid).unwrap();
    fx.engine.hard_delete(&fx.ctx(OWNER), &region.hid).unwrap();
    assert!(fx.store.entity(&region.hid).unwrap().is_none());
}

#[test]
fn orphaned_descendants_keep_their_slot_reserved() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    fx.seed_live("010101", Some(OWNER), true);
    fx.seed_live("0401", None, true);
    let repository = HierarchyRepository::new(&fx.store);
    assert_eq!(repository.next_child_id(&world.hid, None).unwrap().as_str(), "0102");
    assert_eq!(repository.next_root_id().unwrap().as_str(), "05");
}

#[test]
fn restore_keeps_the_pre_delete_lock() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    fx.engine.set_lock(&fx.ctx(OWNER), &world.hid, true).unwrap();
    let proposal = fx.engine.propose_delete(&fx.ctx(OWNER), &world.hid, "").unwrap();
    fx.approve_and_publish(OWNER, &world.hid, proposal.version_number);
    let trashed = fx.entity(&world.hid);
    assert_eq!(trashed.status, EntityStatus::Deleted);
    assert_eq!(trashed.status_before_delete, Some(EntityStatus::Locked));

    let proposal = fx.engine.propose_restore(&fx.ctx(OWNER), &world.hid, "undo").unwrap();
    fx.approve_and_publish(OWNER, &world.hid, proposal.version_number);
    let restored = fx.entity(&world.hid);
    assert_eq!(restored.status, EntityStatus::Locked);
    assert_eq!(restored.status_before_delete, None);
    let err = fx.engine.propose_edit(&fx.ctx(MINION), &world.hid, "Bar", "", "").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::Locked));
}
