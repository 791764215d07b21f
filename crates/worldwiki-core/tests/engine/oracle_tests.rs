// worldwiki-core/tests/engine/oracle_tests.rs
// ============================================================================
// Module: Content Oracle Tests
// Description: Generated description and cover proposals.
// ============================================================================

//! Content oracle integration tests.

use std::cell::RefCell;
use std::time::Duration;

use worldwiki_core::Actor;
use worldwiki_core::ChangePayload;
use worldwiki_core::ContentOracle;
use worldwiki_core::Entity;
use worldwiki_core::ErrorKind;
use worldwiki_core::GeneratedImage;
use worldwiki_core::OracleDeadlines;
use worldwiki_core::OracleError;
use worldwiki_core::Rank;
use worldwiki_core::VersionStatus;
use worldwiki_core::VersionStore;
use worldwiki_core::WorkflowConfig;

use crate::common::Fixture;
use crate::common::MINION;
use crate::common::OUTSIDER;
use crate::common::OWNER;

/// Scripted oracle outcome.
#[derive(Clone, Copy)]
enum Script {
    /// Return generated content.
    Succeed,
    /// Report a service failure.
    Fail,
    /// Report an elapsed deadline.
    TimeOut,
}

/// Oracle that follows a script and records the deadlines it was given.
struct ScriptedOracle {
    /// Outcome of every call.
    script: Script,
    /// Deadlines received, in call order.
    deadlines: RefCell<Vec<Duration>>,
}

impl ScriptedOracle {
    /// Creates an oracle following `script`.
    fn new(script: Script) -> Self {
        Self {
            script,
            deadlines: RefCell::new(Vec::new()),
        }
    }

    /// Records a call and applies the script.
    fn answer<T>(&self, deadline: Duration, value: T) -> Result<T, OracleError> {
        self.deadlines.borrow_mut().push(deadline);
        match self.script {
            Script::Succeed => Ok(value),
            Script::Fail => Err(OracleError::Failed("model unavailable".to_string())),
            Script::TimeOut => Err(OracleError::Timeout(deadline)),
        }
    }

    /// Returns the number of calls made.
    fn calls(&self) -> usize {
        self.deadlines.borrow().len()
    }
}

impl ContentOracle for ScriptedOracle {
    fn expand_description(
        &self,
        entity: &Entity,
        prompt: &str,
        deadline: Duration,
    ) -> Result<String, OracleError> {
        self.answer(deadline, format!("{} ({prompt}) expanded", entity.name))
    }

    fn generate_cover(
        &self,
        entity: &Entity,
        _prompt: &str,
        deadline: Duration,
    ) -> Result<GeneratedImage, OracleError> {
        self.answer(
            deadline,
            GeneratedImage {
                filename: format!("{}-cover.png", entity.hid),
            },
        )
    }
}

#[test]
fn expanded_description_becomes_pending_proposal() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let oracle = ScriptedOracle::new(Script::Succeed);
    let proposal = fx
        .engine
        .propose_expanded_description(&fx.ctx(MINION), &world.hid, &oracle, "harbors")
        .unwrap();
    assert_eq!(proposal.status, VersionStatus::Pending);
    assert_eq!(proposal.proposed_name, "Foo");
    assert_eq!(proposal.proposed_description, "Foo (harbors) expanded");
    assert_eq!(oracle.deadlines.borrow().as_slice(), &[OracleDeadlines::default().text]);
}

#[test]
fn generated_cover_is_uploaded_then_proposed() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let oracle = ScriptedOracle::new(Script::Succeed);
    let proposal = fx
        .engine
        .propose_generated_cover(&fx.ctx(MINION), &world.hid, &oracle, "sunset")
        .unwrap();
    assert_eq!(
        proposal.payload,
        ChangePayload::SetCover {
            cover_image: "01-cover.png".to_string()
        }
    );
    let actions: Vec<&str> = fx
        .audit
        .events_for(world.hid.as_str())
        .iter()
        .rev()
        .take(2)
        .map(|event| event.action.as_str())
        .collect();
    assert_eq!(actions, vec!["PROPOSE_COVER", "UPLOAD_PHOTO"]);

    fx.approve_and_publish(OWNER, &world.hid, proposal.version_number);
    assert_eq!(fx.entity(&world.hid).metadata.cover_image.as_deref(), Some("01-cover.png"));
}

#[test]
fn oracle_failures_write_nothing() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let audited = fx.audit.events().len();
    for script in [Script::Fail, Script::TimeOut] {
        let oracle = ScriptedOracle::new(script);
        let err = fx
            .engine
            .propose_expanded_description(&fx.ctx(MINION), &world.hid, &oracle, "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        let err = fx
            .engine
            .propose_generated_cover(&fx.ctx(MINION), &world.hid, &oracle, "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert_eq!(oracle.calls(), 2);
    }
    assert_eq!(fx.store.versions(&world.hid).unwrap().len(), 1);
    assert_eq!(fx.audit.events().len(), audited);
}

#[test]
fn unauthorized_actors_never_reach_the_oracle() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Foo");
    let oracle = ScriptedOracle::new(Script::Succeed);
    let err = fx
        .engine
        .propose_expanded_description(&fx.ctx(OUTSIDER), &world.hid, &oracle, "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = fx
        .engine
        .propose_generated_cover(&fx.anonymous(), &world.hid, &oracle, "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn configured_deadlines_reach_the_oracle() {
    let fx = Fixture::with_config(WorkflowConfig {
        public_id_seed: Some(3),
        oracle_deadlines: OracleDeadlines {
            text: Duration::from_millis(250),
            image: Duration::from_millis(900),
        },
        ..WorkflowConfig::default()
    });
    fx.register(Actor::new(OWNER, Rank::User));
    let world = fx.world(OWNER, "Foo");
    let oracle = ScriptedOracle::new(Script::Succeed);
    fx.engine.propose_expanded_description(&fx.ctx(OWNER), &world.hid, &oracle, "").unwrap();
    fx.engine.propose_generated_cover(&fx.ctx(OWNER), &world.hid, &oracle, "").unwrap();
    assert_eq!(
        oracle.deadlines.borrow().as_slice(),
        &[Duration::from_millis(250), Duration::from_millis(900)]
    );
}
