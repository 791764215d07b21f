// worldwiki-core/tests/engine/deep_tests.rs
// ============================================================================
// Module: Hierarchy and Deep Creation Tests
// Description: Identifier allocation, structural gaps, and tree display.
// ============================================================================

//! Hierarchy allocation and deep-creation tests.

use serde_json::json;
use worldwiki_core::ActorId;
use worldwiki_core::ChildRequest;
use worldwiki_core::DeepCreationService;
use worldwiki_core::ErrorKind;
use worldwiki_core::HierarchyError;
use worldwiki_core::HierarchyRepository;
use worldwiki_core::Level;
use worldwiki_core::STRUCTURAL_NAME;
use worldwiki_core::VersionStatus;
use worldwiki_core::visible_children;

use crate::common::Fixture;
use crate::common::MINION;
use crate::common::OWNER;
use crate::common::hid;

/// Seeds the `02 > 0202 > 020202` chain owned by [`OWNER`].
fn seeded_chain(fx: &Fixture) {
    fx.seed_live("02", Some(OWNER), true);
    fx.seed_live("0202", Some(OWNER), true);
    fx.seed_live("020202", Some(OWNER), true);
}

#[test]
fn next_child_id_counts_existing_siblings() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let repository = HierarchyRepository::new(&fx.store);
    assert_eq!(repository.next_child_id(&world.hid, None).unwrap(), hid("0101"));
    fx.child(OWNER, &world.hid, "Harbor");
    assert_eq!(repository.next_child_id(&world.hid, None).unwrap(), hid("0102"));
    assert_eq!(repository.next_root_id().unwrap(), hid("02"));
}

#[test]
fn next_child_id_requires_existing_parent() {
    let fx = Fixture::with_cast();
    let repository = HierarchyRepository::new(&fx.store);
    let err = repository.next_child_id(&hid("07"), None).unwrap_err();
    assert!(matches!(err, HierarchyError::UnknownParent(parent) if parent == hid("07")));
}

#[test]
fn save_rejects_duplicate_identifier() {
    let fx = Fixture::with_cast();
    let existing = fx.seed_live("03", Some(OWNER), true);
    let repository = HierarchyRepository::new(&fx.store);
    let err = repository.save(&existing).unwrap_err();
    assert!(matches!(err, HierarchyError::DuplicateIdentifier(taken) if taken == existing.hid));
}

#[test]
fn deep_child_synthesizes_structural_gaps() {
    let fx = Fixture::with_cast();
    seeded_chain(&fx);
    let request =
        ChildRequest::under(hid("020202"), "Lighthouse", "").at_level(Level::new(8).unwrap());
    let created = fx.engine.propose_child(&fx.ctx(OWNER), &request).unwrap();

    assert_eq!(created.entity.hid.as_str(), "0202020000000001");
    assert_eq!(created.entity.hid.level(), Level::new(8).unwrap());
    let gaps: Vec<&str> = created.gaps.iter().map(|gap| gap.as_str()).collect();
    assert_eq!(gaps, vec!["02020200", "0202020000", "020202000000", "02020200000000"]);
    for gap in &created.gaps {
        let entity = fx.entity(gap);
        assert_eq!(entity.name, STRUCTURAL_NAME);
        assert!(entity.is_gap());
        assert!(entity.is_public_live());
        assert_eq!(entity.author.as_ref().map(ActorId::as_str), Some(OWNER));
        assert_eq!(fx.version(gap, 1).status, VersionStatus::Live);
    }

    let repository = HierarchyRepository::new(&fx.store);
    assert_eq!(repository.descendants(&hid("020202"), None).unwrap().len(), 5);
    let level_eight = repository.descendants(&hid("020202"), Some(Level::new(8).unwrap()));
    assert_eq!(level_eight.unwrap().len(), 1);
}

#[test]
fn gaps_cut_by_a_minion_belong_to_the_parent_owner() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let request =
        ChildRequest::under(world.hid.clone(), "Lighthouse", "").at_level(Level::new(3).unwrap());
    let created = fx.engine.propose_child(&fx.ctx(MINION), &request).unwrap();
    let gap = hid("0100");
    assert_eq!(created.gaps, vec![gap.clone()]);
    let entity = fx.entity(&gap);
    assert_eq!(entity.author.as_ref().map(ActorId::as_str), Some(OWNER));
    assert_eq!(fx.version(&gap, 1).author.as_ref().map(ActorId::as_str), Some(OWNER));

    let renamed = fx.engine.propose_edit(&fx.ctx(OWNER), &gap, "Reaches", "", "").unwrap();
    let published = fx.approve_and_publish(OWNER, &gap, renamed.version_number);
    assert_eq!(published.status, VersionStatus::Live);
    let solid = fx.entity(&gap);
    assert_eq!(solid.name, "Reaches");
    assert!(!solid.is_gap());
}

#[test]
fn existing_gaps_are_reused() {
    let fx = Fixture::with_cast();
    seeded_chain(&fx);
    let deep =
        ChildRequest::under(hid("020202"), "Lighthouse", "").at_level(Level::new(8).unwrap());
    fx.engine.propose_child(&fx.ctx(OWNER), &deep).unwrap();

    let plan = DeepCreationService::new(&fx.store)
        .plan(&hid("020202"), Level::new(8).unwrap())
        .unwrap();
    assert_eq!(plan.chain.len(), 4);
    assert!(plan.missing.is_empty());

    let second =
        ChildRequest::under(hid("020202"), "Beacon", "").at_level(Level::new(8).unwrap());
    let created = fx.engine.propose_child(&fx.ctx(OWNER), &second).unwrap();
    assert_eq!(created.entity.hid.as_str(), "0202020000000002");
    assert!(created.gaps.is_empty());
}

#[test]
fn target_level_must_be_deeper_than_parent() {
    let fx = Fixture::with_cast();
    seeded_chain(&fx);
    let plan = DeepCreationService::new(&fx.store).plan(&hid("020202"), Level::new(3).unwrap());
    assert!(plan.is_err());
    let request =
        ChildRequest::under(hid("020202"), "Nowhere", "").at_level(Level::new(2).unwrap());
    let err = fx.engine.propose_child(&fx.ctx(OWNER), &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let descendants = HierarchyRepository::new(&fx.store).descendants(&hid("020202"), None);
    assert!(descendants.unwrap().is_empty());
}

#[test]
fn empty_gaps_are_hidden_from_tree_display() {
    let fx = Fixture::with_cast();
    seeded_chain(&fx);
    let request =
        ChildRequest::under(hid("020202"), "Lighthouse", "").at_level(Level::new(8).unwrap());
    let created = fx.engine.propose_child(&fx.ctx(OWNER), &request).unwrap();

    let shown = fx.engine.children(&fx.anonymous(), &hid("020202")).unwrap();
    assert!(shown.is_empty());
    let owned = fx.engine.children(&fx.ctx(OWNER), &hid("020202")).unwrap();
    let owned: Vec<&str> = owned.iter().map(|entity| entity.hid.as_str()).collect();
    assert_eq!(owned, vec!["02020200"]);

    fx.approve_and_publish(OWNER, &created.entity.hid, 1);
    let direct = fx.child(OWNER, &hid("020202"), "Quay");
    assert_eq!(direct.hid.as_str(), "02020201");
    let shown = fx.engine.children(&fx.anonymous(), &hid("020202")).unwrap();
    let shown: Vec<&str> = shown.iter().map(|entity| entity.hid.as_str()).collect();
    assert_eq!(shown, vec!["02020200", "02020201"]);

    let descendants =
        HierarchyRepository::new(&fx.store).descendants(&hid("02020200"), None).unwrap();
    let below_gap = visible_children(&hid("02020200"), &descendants);
    assert_eq!(below_gap.len(), 1);
    assert_eq!(below_gap[0].hid.as_str(), "0202020000");
}

#[test]
fn properties_inherit_from_nearest_ancestor() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let region = fx.child(OWNER, &world.hid, "Coast");
    let city = fx.child(OWNER, &region.hid, "Harbor");
    let facts = json!({ "climate": "temperate", "language": "Old Tongue" });
    fx.engine.propose_metadata(&fx.ctx(OWNER), &world.hid, &facts, "").unwrap();
    fx.approve_and_publish(OWNER, &world.hid, 2);
    fx.engine
        .propose_metadata(&fx.ctx(OWNER), &region.hid, &json!({ "climate": "humid" }), "")
        .unwrap();
    fx.approve_and_publish(OWNER, &region.hid, 2);
    fx.engine
        .propose_metadata(&fx.ctx(OWNER), &city.hid, &json!({ "population": "900" }), "")
        .unwrap();
    fx.approve_and_publish(OWNER, &city.hid, 2);

    let resolved = fx.engine.inherited_properties(&fx.anonymous(), &city.hid).unwrap();
    let find = |key: &str| resolved.iter().find(|property| property.key == key).unwrap();
    assert!(!find("population").inherited);
    assert_eq!(find("climate").value, "humid");
    assert_eq!(find("climate").source, region.hid);
    assert!(find("climate").inherited);
    assert_eq!(find("language").source, world.hid);
    assert_eq!(resolved.len(), 3);
}
