// worldwiki-core/tests/common/mod.rs
// ============================================================================
// Module: Engine Test Fixtures
// Description: Shared fixtures for workflow, policy, and period tests.
// ============================================================================

//! Shared helpers for engine integration tests.

use std::cell::Cell;

use worldwiki_core::Actor;
use worldwiki_core::ActorRegistry;
use worldwiki_core::ChangeKind;
use worldwiki_core::ChangePayload;
use worldwiki_core::ChildRequest;
use worldwiki_core::Entity;
use worldwiki_core::EntityStatus;
use worldwiki_core::EntityStore;
use worldwiki_core::Hid;
use worldwiki_core::InMemoryAuditLog;
use worldwiki_core::InMemoryNotificationSink;
use worldwiki_core::InMemoryWikiStore;
use worldwiki_core::PublicId;
use worldwiki_core::Rank;
use worldwiki_core::RequestContext;
use worldwiki_core::Timestamp;
use worldwiki_core::Version;
use worldwiki_core::VersionStatus;
use worldwiki_core::VersionStore;
use worldwiki_core::WikiStore;
use worldwiki_core::WorkflowConfig;
use worldwiki_core::WorkflowEngine;
use worldwiki_core::WriteBatch;
use worldwiki_core::WriteOp;

/// Superuser registered by [`Fixture::with_cast`].
pub const ROOT: &str = "root";
/// Regular owner registered by [`Fixture::with_cast`].
pub const OWNER: &str = "owner";
/// Minion of [`OWNER`] registered by [`Fixture::with_cast`].
pub const MINION: &str = "minion";
/// Unrelated user registered by [`Fixture::with_cast`].
pub const OUTSIDER: &str = "outsider";

/// Engine wired to recording sinks.
pub type TestEngine =
    WorkflowEngine<InMemoryWikiStore, InMemoryNotificationSink, InMemoryAuditLog>;

/// In-memory engine with recording sinks and a logical clock.
pub struct Fixture {
    /// Shared store handle.
    pub store: InMemoryWikiStore,
    /// Recorded audit events.
    pub audit: InMemoryAuditLog,
    /// Recorded notifications.
    pub notifications: InMemoryNotificationSink,
    /// Engine under test.
    pub engine: TestEngine,
    /// Logical clock.
    clock: Cell<u64>,
    /// Counter for seeded public IDs.
    seeded: Cell<u32>,
}

impl Fixture {
    /// Creates an empty fixture with deterministic identifiers.
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig {
            public_id_seed: Some(7),
            ..WorkflowConfig::default()
        })
    }

    /// Creates an empty fixture with a custom engine configuration.
    pub fn with_config(config: WorkflowConfig) -> Self {
        let store = InMemoryWikiStore::new();
        let audit = InMemoryAuditLog::new();
        let notifications = InMemoryNotificationSink::new();
        let engine =
            WorkflowEngine::new(store.clone(), notifications.clone(), audit.clone(), config);
        Self {
            store,
            audit,
            notifications,
            engine,
            clock: Cell::new(0),
            seeded: Cell::new(0),
        }
    }

    /// Creates a fixture with a superuser, an owner, the owner's minion, and
    /// an unrelated user.
    pub fn with_cast() -> Self {
        let fixture = Self::new();
        fixture.register(Actor::superuser(ROOT));
        fixture.register(Actor::new(OWNER, Rank::User));
        fixture.register(Actor::new(MINION, Rank::User).with_boss(OWNER));
        fixture.register(Actor::new(OUTSIDER, Rank::User));
        fixture
    }

    /// Registers an actor through the registry.
    pub fn register(&self, actor: Actor) {
        ActorRegistry::new(self.store.clone()).register(actor).expect("register actor");
    }

    /// Advances the logical clock.
    pub fn tick(&self) -> Timestamp {
        let next = self.clock.get() + 1;
        self.clock.set(next);
        Timestamp::Logical(next)
    }

    /// Returns a request context for `actor` at the next tick.
    pub fn ctx(&self, actor: &str) -> RequestContext {
        RequestContext::as_actor(actor, self.tick())
    }

    /// Returns an anonymous request context at the next tick.
    pub fn anonymous(&self) -> RequestContext {
        RequestContext::anonymous(self.tick())
    }

    /// Creates and publishes a root world owned by `owner`.
    pub fn world(&self, owner: &str, name: &str) -> Entity {
        let created = self
            .engine
            .propose_child(&self.ctx(owner), &ChildRequest::root(name, format!("{name} lore")))
            .expect("propose root");
        self.approve_and_publish(owner, &created.entity.hid, 1);
        self.entity(&created.entity.hid)
    }

    /// Creates and publishes a direct child; `owner` must own `parent`.
    pub fn child(&self, owner: &str, parent: &Hid, name: &str) -> Entity {
        let created = self
            .engine
            .propose_child(&self.ctx(owner), &ChildRequest::under(parent.clone(), name, ""))
            .expect("propose child");
        self.approve_and_publish(owner, &created.entity.hid, 1);
        self.entity(&created.entity.hid)
    }

    /// Approves then publishes a version as `reviewer`.
    pub fn approve_and_publish(&self, reviewer: &str, hid: &Hid, number: u64) -> Version {
        self.engine.approve(&self.ctx(reviewer), hid, number, None).expect("approve");
        self.engine.publish(&self.ctx(reviewer), hid, number).expect("publish")
    }

    /// Writes a published entity directly into the store.
    pub fn seed_live(&self, hid: &str, author: Option<&str>, public: bool) -> Entity {
        let count = self.seeded.get() + 1;
        self.seeded.set(count);
        let at = self.tick();
        let hid = Hid::parse(hid).expect("seed hid");
        let public_id = PublicId::parse(format!("seed{count:06}")).expect("seed public id");
        let mut entity = Entity::draft(
            hid.clone(),
            public_id,
            format!("Seed {hid}"),
            "",
            author.map(Into::into),
            at,
        );
        entity.status = EntityStatus::Live;
        entity.visibility_public = public;
        entity.current_version_number = 1;
        let version = Version {
            hid: hid.clone(),
            version_number: 1,
            created_at: at,
            reviewed_at: Some(at),
            proposed_name: entity.name.clone(),
            proposed_description: String::new(),
            payload: ChangePayload::Add {
                level: hid.level(),
                parent: hid.parent(),
            },
            kind: ChangeKind::Live,
            status: VersionStatus::Live,
            change_log: String::new(),
            author: entity.author.clone(),
            reviewer: None,
            admin_feedback: None,
        };
        let mut batch = WriteBatch::new();
        batch.write(WriteOp::PutEntity(entity.clone())).write(WriteOp::PutVersion(version));
        self.store.commit(&batch).expect("seed entity");
        entity
    }

    /// Loads an entity straight from the store.
    pub fn entity(&self, hid: &Hid) -> Entity {
        self.store.entity(hid).expect("load entity").expect("entity exists")
    }

    /// Loads a version straight from the store.
    pub fn version(&self, hid: &Hid, number: u64) -> Version {
        self.store.version(hid, number).expect("load version").expect("version exists")
    }

    /// Counts LIVE versions of an entity.
    pub fn live_count(&self, hid: &Hid) -> usize {
        self.store
            .versions(hid)
            .expect("load versions")
            .iter()
            .filter(|version| version.status == VersionStatus::Live)
            .count()
    }
}

/// Parses a HID literal.
pub fn hid(value: &str) -> Hid {
    Hid::parse(value).expect("valid hid")
}
