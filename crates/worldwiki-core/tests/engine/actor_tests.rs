// worldwiki-core/tests/engine/actor_tests.rs
// ============================================================================
// Module: Actor and Owner Control Tests
// Description: Registry lifecycle, supervision edges, locks, and toggles.
// ============================================================================

//! Actor registry and owner control tests.

use worldwiki_core::Actor;
use worldwiki_core::ActorId;
use worldwiki_core::ActorLifecycle;
use worldwiki_core::ActorRegistry;
use worldwiki_core::ChildRequest;
use worldwiki_core::EntityStatus;
use worldwiki_core::ErrorKind;
use worldwiki_core::ProfileDefaults;
use worldwiki_core::Rank;
use worldwiki_core::RegistryError;
use worldwiki_core::TransitionError;
use worldwiki_core::VersionStatus;

use crate::common::Fixture;
use crate::common::MINION;
use crate::common::OUTSIDER;
use crate::common::OWNER;
use crate::common::ROOT;

/// Lifecycle hook promoting every new actor to the user rank.
struct PromoteExplorers;

impl ActorLifecycle for PromoteExplorers {
    fn on_create(&self, actor: &mut Actor) {
        if actor.rank == Rank::Explorer {
            actor.rank = Rank::User;
        }
    }
}

#[test]
fn register_fills_default_avatar_and_rejects_duplicates() {
    let fx = Fixture::new();
    let registry = ActorRegistry::new(fx.store.clone());
    let actor = registry.register(Actor::new("ana", Rank::User)).unwrap();
    assert_eq!(actor.avatar.as_deref(), Some("default_avatar.png"));
    let err = registry.register(Actor::new("ana", Rank::Admin)).unwrap_err();
    assert_eq!(err, RegistryError::Duplicate(ActorId::from("ana")));
    let stored = registry.get(&ActorId::from("ana")).unwrap().unwrap();
    assert_eq!(stored.rank, Rank::User);
}

#[test]
fn custom_lifecycle_hooks_run_on_create() {
    let fx = Fixture::new();
    let custom = ProfileDefaults {
        avatar: Some("sigil.png".to_string()),
    };
    let registry = ActorRegistry::with_lifecycle(fx.store.clone(), custom);
    let actor = registry.register(Actor::new("ana", Rank::User)).unwrap();
    assert_eq!(actor.avatar.as_deref(), Some("sigil.png"));

    let promoting = ActorRegistry::with_lifecycle(fx.store.clone(), PromoteExplorers);
    let actor = promoting.register(Actor::new("ben", Rank::Explorer)).unwrap();
    assert_eq!(actor.rank, Rank::User);
    assert_eq!(actor.avatar, None);
}

#[test]
fn supervision_edges_are_validated() {
    let fx = Fixture::with_cast();
    let registry = ActorRegistry::new(fx.store.clone());
    let outsider = ActorId::from(OUTSIDER);
    let err = registry.assign_boss(&outsider, &outsider).unwrap_err();
    assert_eq!(err, RegistryError::SelfSupervision(outsider.clone()));
    let err = registry.assign_boss(&outsider, &ActorId::from("ghost")).unwrap_err();
    assert_eq!(err, RegistryError::UnknownActor(ActorId::from("ghost")));

    let linked = registry.assign_boss(&outsider, &ActorId::from(OWNER)).unwrap();
    assert!(linked.bosses.contains(&ActorId::from(OWNER)));
    assert!(registry.directory().unwrap().is_boss_of(&ActorId::from(OWNER), &outsider));

    let unlinked = registry.remove_boss(&outsider, &ActorId::from(OWNER)).unwrap();
    assert!(unlinked.bosses.is_empty());
}

#[test]
fn new_boss_link_grants_proposal_rights() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    fx.engine.propose_edit(&fx.ctx(MINION), &world.hid, "Bar", "", "").unwrap();
    let registry = ActorRegistry::new(fx.store.clone());
    registry.assign_boss(&ActorId::from(OUTSIDER), &ActorId::from(OWNER)).unwrap();

    let proposal =
        fx.engine.propose_edit(&fx.ctx(OUTSIDER), &world.hid, "Baz", "", "").unwrap();
    assert_eq!(proposal.version_number, 3);
    assert_eq!(fx.engine.versions(&fx.ctx(OUTSIDER), &world.hid).unwrap().len(), 3);
}

#[test]
fn deleting_actor_removes_edges_and_protects_superusers() {
    let fx = Fixture::with_cast();
    let registry = ActorRegistry::new(fx.store.clone()).with_protected([ActorId::from(OUTSIDER)]);
    let err = registry.delete(&ActorId::from(ROOT)).unwrap_err();
    assert_eq!(err, RegistryError::ProtectedActor(ActorId::from(ROOT)));
    let err = registry.delete(&ActorId::from(OUTSIDER)).unwrap_err();
    assert_eq!(err, RegistryError::ProtectedActor(ActorId::from(OUTSIDER)));
    let err = registry.delete(&ActorId::from("ghost")).unwrap_err();
    assert_eq!(err, RegistryError::UnknownActor(ActorId::from("ghost")));

    registry.delete(&ActorId::from(OWNER)).unwrap();
    assert!(registry.get(&ActorId::from(OWNER)).unwrap().is_none());
    let minion = registry.get(&ActorId::from(MINION)).unwrap().unwrap();
    assert!(minion.bosses.is_empty());
}

#[test]
fn lock_blocks_collaborators_but_not_owner() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let locked = fx.engine.set_lock(&fx.ctx(OWNER), &world.hid, true).unwrap();
    assert_eq!(locked.status, EntityStatus::Locked);
    assert!(locked.is_public_live());

    let err = fx.engine.propose_edit(&fx.ctx(MINION), &world.hid, "Bar", "", "").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::Locked));
    let err = fx.engine.propose_edit(&fx.ctx(OUTSIDER), &world.hid, "Bar", "", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let own = fx.engine.propose_edit(&fx.ctx(OWNER), &world.hid, "Bar", "", "").unwrap();
    assert_eq!(own.status, VersionStatus::Pending);

    fx.approve_and_publish(OWNER, &world.hid, own.version_number);
    assert_eq!(fx.entity(&world.hid).status, EntityStatus::Locked);

    let unlocked = fx.engine.set_lock(&fx.ctx(OWNER), &world.hid, false).unwrap();
    assert_eq!(unlocked.status, EntityStatus::Live);
    assert!(fx.engine.propose_edit(&fx.ctx(MINION), &world.hid, "Baz", "", "").is_ok());
}

#[test]
fn disabling_proposals_blocks_collaborators() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let err = fx.engine.set_allow_proposals(&fx.ctx(MINION), &world.hid, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let closed = fx.engine.set_allow_proposals(&fx.ctx(OWNER), &world.hid, false).unwrap();
    assert!(!closed.allow_proposals);
    let err = fx.engine.propose_edit(&fx.ctx(MINION), &world.hid, "Bar", "", "").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::ProposalsDisabled));
    assert!(fx.engine.propose_edit(&fx.ctx(ROOT), &world.hid, "Bar", "", "").is_ok());

    let toggles = fx
        .audit
        .events_for(world.hid.as_str())
        .into_iter()
        .filter(|event| event.action.as_str() == "TOGGLE_PROPOSALS")
        .count();
    assert_eq!(toggles, 1);
    fx.engine.set_allow_proposals(&fx.ctx(OWNER), &world.hid, false).unwrap();
    assert_eq!(
        fx.audit
            .events_for(world.hid.as_str())
            .iter()
            .filter(|event| event.action.as_str() == "TOGGLE_PROPOSALS")
            .count(),
        1
    );
}

#[test]
fn drafts_cannot_be_locked() {
    let fx = Fixture::with_cast();
    let created = fx
        .engine
        .propose_child(&fx.ctx(OWNER), &ChildRequest::root("Draft", ""))
        .unwrap();
    let err = fx.engine.set_lock(&fx.ctx(OWNER), &created.entity.hid, true).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotPublished));
}
