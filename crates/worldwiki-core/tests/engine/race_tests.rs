// worldwiki-core/tests/engine/race_tests.rs
// ============================================================================
// Module: Publish Race Tests
// Description: Competing publishes resolved through batch preconditions.
// ============================================================================

//! Concurrent publish tests over the in-memory store.

use std::cell::RefCell;
use std::sync::Barrier;
use std::thread;

use worldwiki_core::Actor;
use worldwiki_core::ActorId;
use worldwiki_core::ActorRegistry;
use worldwiki_core::ActorStore;
use worldwiki_core::ChildRequest;
use worldwiki_core::ConflictKind;
use worldwiki_core::Entity;
use worldwiki_core::EntityQuery;
use worldwiki_core::EntityStore;
use worldwiki_core::Hid;
use worldwiki_core::InMemoryWikiStore;
use worldwiki_core::PeriodId;
use worldwiki_core::PeriodStore;
use worldwiki_core::PeriodVersion;
use worldwiki_core::PublicId;
use worldwiki_core::RequestContext;
use worldwiki_core::StoreError;
use worldwiki_core::TimelinePeriod;
use worldwiki_core::Timestamp;
use worldwiki_core::TransitionError;
use worldwiki_core::Version;
use worldwiki_core::VersionQuery;
use worldwiki_core::VersionStatus;
use worldwiki_core::VersionStore;
use worldwiki_core::WikiStore;
use worldwiki_core::WorkflowConfig;
use worldwiki_core::WorkflowEngine;
use worldwiki_core::WorkflowError;
use worldwiki_core::WriteBatch;

use crate::common::ROOT;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Store that lets a rival operation commit right before its first commit.
struct InterleavedStore {
    /// Shared backing store.
    inner: InMemoryWikiStore,
    /// Rival operation run once, ahead of the next commit.
    rival: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl EntityStore for InterleavedStore {
    fn entity(&self, hid: &Hid) -> Result<Option<Entity>, StoreError> {
        self.inner.entity(hid)
    }

    fn entity_by_public_id(&self, public_id: &PublicId) -> Result<Option<Entity>, StoreError> {
        self.inner.entity_by_public_id(public_id)
    }

    fn query_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        self.inner.query_entities(query)
    }
}

impl VersionStore for InterleavedStore {
    fn version(&self, hid: &Hid, number: u64) -> Result<Option<Version>, StoreError> {
        self.inner.version(hid, number)
    }

    fn versions(&self, hid: &Hid) -> Result<Vec<Version>, StoreError> {
        self.inner.versions(hid)
    }

    fn query_versions(&self, query: &VersionQuery) -> Result<Vec<Version>, StoreError> {
        self.inner.query_versions(query)
    }
}

impl PeriodStore for InterleavedStore {
    fn period(&self, id: &PeriodId) -> Result<Option<TimelinePeriod>, StoreError> {
        self.inner.period(id)
    }

    fn periods(&self, hid: &Hid) -> Result<Vec<TimelinePeriod>, StoreError> {
        self.inner.periods(hid)
    }

    fn period_version(
        &self,
        id: &PeriodId,
        number: i64,
    ) -> Result<Option<PeriodVersion>, StoreError> {
        self.inner.period_version(id, number)
    }

    fn period_versions(&self, id: &PeriodId) -> Result<Vec<PeriodVersion>, StoreError> {
        self.inner.period_versions(id)
    }
}

impl ActorStore for InterleavedStore {
    fn actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        self.inner.actor(id)
    }

    fn actors(&self) -> Result<Vec<Actor>, StoreError> {
        self.inner.actors()
    }
}

impl WikiStore for InterleavedStore {
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let rival = self.rival.borrow_mut().take();
        if let Some(rival) = rival {
            rival();
        }
        self.inner.commit(batch)
    }
}

/// Superuser context at a fixed logical time.
fn root_at(tick: u64) -> RequestContext {
    RequestContext::as_actor(ROOT, Timestamp::Logical(tick))
}

/// Publishes a world and leaves versions 2 and 3 approved against it.
fn contested<S: WikiStore>(engine: &WorkflowEngine<S>, tick: u64) -> Hid {
    let ctx = root_at(tick);
    let world = engine.propose_child(&ctx, &ChildRequest::root("Aster", "")).unwrap().entity.hid;
    engine.publish(&ctx, &world, 1).unwrap();
    for name in ["Ember", "Cinder"] {
        let proposal = engine.propose_edit(&ctx, &world, name, "", "").unwrap();
        engine.approve(&ctx, &world, proposal.version_number, None).unwrap();
    }
    world
}

/// Publishes versions 2 and 3 of `hid` from two threads released together.
fn race<S>(store: &S, hid: &Hid) -> Vec<Result<Version, WorkflowError>>
where
    S: WikiStore + Clone + Send + Sync,
{
    let barrier = Barrier::new(2);
    thread::scope(|scope| {
        let handles: Vec<_> = [2u64, 3]
            .into_iter()
            .map(|number| {
                let barrier = &barrier;
                scope.spawn(move || {
                    let engine =
                        WorkflowEngine::with_store(store.clone(), WorkflowConfig::default());
                    let ctx = root_at(100 + number);
                    barrier.wait();
                    engine.publish(&ctx, hid, number)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    })
}

/// Asserts that a race left exactly one consistent LIVE version.
fn assert_single_winner(
    store: &impl WikiStore,
    hid: &Hid,
    results: &[Result<Version, WorkflowError>],
) {
    let wins = results.iter().filter(|result| result.is_ok()).count();
    assert!(wins >= 1, "no publish won for {hid}");
    for err in results.iter().filter_map(|result| result.as_ref().err()) {
        let superseded = err.conflict() == Some(ConflictKind::Superseded);
        let archived = err.transition() == Some(TransitionError::Immutable);
        assert!(superseded || archived, "unexpected loser error: {err}");
    }
    let versions = store.versions(hid).unwrap();
    let live: Vec<&Version> =
        versions.iter().filter(|version| version.status == VersionStatus::Live).collect();
    assert_eq!(live.len(), 1, "live versions of {hid}");
    let entity = store.entity(hid).unwrap().unwrap();
    assert_eq!(entity.current_version_number, live[0].version_number);
    assert_eq!(entity.name, live[0].proposed_name);
    if wins == 2 {
        assert_eq!(live[0].version_number, 3);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn publish_losing_the_commit_race_is_superseded() {
    let inner = InMemoryWikiStore::new();
    ActorRegistry::new(inner.clone()).register(Actor::superuser(ROOT)).unwrap();
    let config = WorkflowConfig {
        public_id_seed: Some(7),
        ..WorkflowConfig::default()
    };
    let store = InterleavedStore {
        inner: inner.clone(),
        rival: RefCell::new(None),
    };
    let engine = WorkflowEngine::with_store(store, config.clone());
    let world = contested(&engine, 1);

    let rival = WorkflowEngine::with_store(inner.clone(), config);
    let target = world.clone();
    *engine.store().rival.borrow_mut() = Some(Box::new(move || {
        rival.publish(&root_at(50), &target, 2).unwrap();
    }));

    let err = engine.publish(&root_at(51), &world, 3).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictKind::Superseded));
    let entity = inner.entity(&world).unwrap().unwrap();
    assert_eq!(entity.name, "Ember");
    assert_eq!(entity.current_version_number, 2);
    assert_eq!(inner.version(&world, 3).unwrap().unwrap().status, VersionStatus::Approved);

    engine.publish(&root_at(52), &world, 3).unwrap();
    assert_eq!(inner.entity(&world).unwrap().unwrap().name, "Cinder");
    assert_eq!(inner.version(&world, 2).unwrap().unwrap().status, VersionStatus::History);
}

#[test]
fn concurrent_publishes_leave_one_live_version() {
    let store = InMemoryWikiStore::new();
    ActorRegistry::new(store.clone()).register(Actor::superuser(ROOT)).unwrap();
    let setup = WorkflowEngine::with_store(store.clone(), WorkflowConfig {
        public_id_seed: Some(7),
        ..WorkflowConfig::default()
    });
    for round in 0 .. 8 {
        let world = contested(&setup, round * 10 + 1);
        let results = race(&store, &world);
        assert_single_winner(&store, &world, &results);
    }
}
