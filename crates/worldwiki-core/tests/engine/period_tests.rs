// worldwiki-core/tests/engine/period_tests.rs
// ============================================================================
// Module: Timeline Period Tests
// Description: Period creation, proposals, publication, and activation.
// ============================================================================

//! Timeline period workflow tests.

use serde_json::json;
use worldwiki_core::Action;
use worldwiki_core::Actor;
use worldwiki_core::ConflictKind;
use worldwiki_core::ErrorKind;
use worldwiki_core::Hid;
use worldwiki_core::NewPeriod;
use worldwiki_core::PeriodEdit;
use worldwiki_core::PeriodStore;
use worldwiki_core::Rank;
use worldwiki_core::SEED_VERSION_NUMBER;
use worldwiki_core::TimelinePeriod;
use worldwiki_core::TransitionError;
use worldwiki_core::VersionStatus;
use worldwiki_core::WorkflowConfig;

use crate::common::Fixture;
use crate::common::MINION;
use crate::common::OUTSIDER;
use crate::common::OWNER;
use crate::common::ROOT;

/// Builds an edit proposal without metadata.
fn edit(title: &str) -> PeriodEdit {
    PeriodEdit {
        title: title.to_string(),
        description: format!("{title} chronicle"),
        metadata: None,
        change_log: "retitle".to_string(),
    }
}

/// Creates a period owned by [`OWNER`].
fn create(fx: &Fixture, hid: &Hid, title: &str) -> TimelinePeriod {
    fx.engine.periods().create_period(&fx.ctx(OWNER), hid, &NewPeriod::new(title, "")).unwrap()
}

#[test]
fn create_period_seeds_approved_version() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    assert_eq!(period.slug, "age-of-ash");
    assert_eq!(period.order, 0);
    assert!(!period.is_current);
    assert_eq!(period.current_version_number, SEED_VERSION_NUMBER);

    let versions = periods.versions(&fx.ctx(OWNER), &period.id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version_number, SEED_VERSION_NUMBER);
    assert_eq!(versions[0].status, VersionStatus::Approved);
    assert_eq!(versions[0].action, Action::Add);
}

#[test]
fn slugs_are_unique_per_entity_and_order_appends() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let other = fx.world(OWNER, "Borealis");
    let periods = fx.engine.periods();
    let first = create(&fx, &world.hid, "Age of Ash");
    let second = create(&fx, &world.hid, "Age of Ash");
    let elsewhere = create(&fx, &other.hid, "Age of Ash");
    assert_eq!(first.slug, "age-of-ash");
    assert_eq!(second.slug, "age-of-ash-1");
    assert_eq!(elsewhere.slug, "age-of-ash");
    assert_eq!(second.order, first.order + 1);

    let mut early = NewPeriod::new("Dawn", "");
    early.order = Some(-5);
    let dawn = periods.create_period(&fx.ctx(OWNER), &world.hid, &early).unwrap();
    let listed = periods.get_periods(&fx.anonymous(), &world.hid).unwrap();
    let slugs: Vec<&str> = listed.iter().map(|period| period.slug.as_str()).collect();
    assert_eq!(slugs, vec![dawn.slug.as_str(), "age-of-ash", "age-of-ash-1"]);
}

#[test]
fn only_owners_create_periods() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    for actor in [MINION, OUTSIDER] {
        let err = periods
            .create_period(&fx.ctx(actor), &world.hid, &NewPeriod::new("Age of Ash", ""))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
    let err = periods
        .create_period(&fx.ctx(OWNER), &world.hid, &NewPeriod::new(" ", ""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(fx.store.periods(&world.hid).unwrap().is_empty());
}

#[test]
fn published_edit_updates_title_slug_and_metadata() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");

    let mut change = edit("Ember Age");
    change.metadata = Some(json!({ "ruler": "Queen Ilse" }));
    let proposal = periods.propose_edit(&fx.ctx(MINION), &period.id, &change).unwrap();
    assert_eq!(proposal.version_number, 0);
    assert_eq!(proposal.status, VersionStatus::Pending);

    let err = periods.publish(&fx.ctx(OWNER), &period.id, 0).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotApproved));

    periods.approve(&fx.ctx(OWNER), &period.id, 0, None).unwrap();
    let published = periods.publish(&fx.ctx(OWNER), &period.id, 0).unwrap();
    assert_eq!(published.status, VersionStatus::Live);

    let stored = fx.store.period(&period.id).unwrap().unwrap();
    assert_eq!(stored.title, "Ember Age");
    assert_eq!(stored.slug, "ember-age");
    assert_eq!(stored.description, "Ember Age chronicle");
    assert_eq!(stored.metadata.property("ruler"), Some("Queen Ilse"));
    assert_eq!(stored.current_version_number, 0);
    let seed = fx.store.period_version(&period.id, SEED_VERSION_NUMBER).unwrap().unwrap();
    assert_eq!(seed.status, VersionStatus::Approved);
}

#[test]
fn second_publish_moves_live_to_history() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    for (number, title) in [(0, "Ember Age"), (1, "Cinder Age")] {
        periods.propose_edit(&fx.ctx(MINION), &period.id, &edit(title)).unwrap();
        periods.approve(&fx.ctx(OWNER), &period.id, number, None).unwrap();
        periods.publish(&fx.ctx(OWNER), &period.id, number).unwrap();
    }
    let versions = fx.store.period_versions(&period.id).unwrap();
    let status = |number: i64| {
        versions.iter().find(|version| version.version_number == number).map(|v| v.status)
    };
    assert_eq!(status(0), Some(VersionStatus::History));
    assert_eq!(status(1), Some(VersionStatus::Live));
    assert_eq!(fx.store.period(&period.id).unwrap().unwrap().slug, "cinder-age");
}

#[test]
fn rejected_period_proposal_leaves_period_untouched() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    periods.propose_edit(&fx.ctx(MINION), &period.id, &edit("Ember Age")).unwrap();
    let rejected =
        periods.reject(&fx.ctx(OWNER), &period.id, 0, Some("keep it".to_string())).unwrap();
    assert_eq!(rejected.status, VersionStatus::Rejected);
    assert_eq!(rejected.admin_feedback.as_deref(), Some("keep it"));
    let err = periods.approve(&fx.ctx(OWNER), &period.id, 0, None).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotPending));
    assert_eq!(fx.store.period(&period.id).unwrap().unwrap().title, "Age of Ash");
}

#[test]
fn current_period_cannot_be_deleted() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let first = create(&fx, &world.hid, "Age of Ash");
    let second = create(&fx, &world.hid, "Age of Tide");

    let active = periods.activate(&fx.ctx(OWNER), &first.id).unwrap();
    assert!(active.is_current);
    let err = periods.propose_delete(&fx.ctx(MINION), &first.id, "drop").unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::CurrentPeriodProtected));

    periods.activate(&fx.ctx(OWNER), &second.id).unwrap();
    let current = periods.current_period(&fx.anonymous(), &world.hid).unwrap().unwrap();
    assert_eq!(current.id, second.id);
    assert!(!fx.store.period(&first.id).unwrap().unwrap().is_current);

    let proposal = periods.propose_delete(&fx.ctx(MINION), &first.id, "drop").unwrap();
    assert_eq!(proposal.action, Action::Delete);
    periods.approve(&fx.ctx(OWNER), &first.id, proposal.version_number, None).unwrap();
    periods.publish(&fx.ctx(OWNER), &first.id, proposal.version_number).unwrap();
    assert!(fx.store.period(&first.id).unwrap().is_none());
    assert!(fx.store.period_versions(&first.id).unwrap().is_empty());
    assert_eq!(fx.store.periods(&world.hid).unwrap().len(), 1);
}

#[test]
fn delete_approved_before_activation_stays_protected() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    let proposal = periods.propose_delete(&fx.ctx(MINION), &period.id, "drop").unwrap();
    periods.approve(&fx.ctx(OWNER), &period.id, proposal.version_number, None).unwrap();
    periods.activate(&fx.ctx(OWNER), &period.id).unwrap();
    let err = periods.publish(&fx.ctx(OWNER), &period.id, proposal.version_number).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::CurrentPeriodProtected));
    assert!(fx.store.period(&period.id).unwrap().is_some());
}

#[test]
fn activation_is_audited_and_idempotent() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    let err = periods.activate(&fx.ctx(MINION), &period.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    periods.activate(&fx.ctx(OWNER), &period.id).unwrap();
    periods.activate(&fx.ctx(OWNER), &period.id).unwrap();
    let activations = fx
        .audit
        .events_for(period.id.as_str())
        .into_iter()
        .filter(|event| event.action.as_str() == "ACTIVATE_PERIOD")
        .count();
    assert_eq!(activations, 1);
}

#[test]
fn seed_version_is_never_publishable() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    let err = periods.publish(&fx.ctx(OWNER), &period.id, SEED_VERSION_NUMBER).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictKind::Superseded));

    periods.propose_edit(&fx.ctx(MINION), &period.id, &edit("Age Two")).unwrap();
    periods.approve(&fx.ctx(OWNER), &period.id, 0, None).unwrap();
    periods.publish(&fx.ctx(OWNER), &period.id, 0).unwrap();
    for actor in [OWNER, ROOT] {
        let err = periods.publish(&fx.ctx(actor), &period.id, SEED_VERSION_NUMBER).unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictKind::Superseded));
    }

    let stored = fx.store.period(&period.id).unwrap().unwrap();
    assert_eq!(stored.current_version_number, 0);
    assert_eq!(stored.title, "Age Two");
    let live = fx.store.period_version(&period.id, 0).unwrap().unwrap();
    assert_eq!(live.status, VersionStatus::Live);
}

#[test]
fn older_approved_period_version_cannot_replace_newer_live() {
    let fx = Fixture::with_config(WorkflowConfig {
        archive_stale_on_publish: false,
        public_id_seed: Some(7),
        ..WorkflowConfig::default()
    });
    fx.register(Actor::new(OWNER, Rank::User));
    fx.register(Actor::new(MINION, Rank::User).with_boss(OWNER));
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    for title in ["Ember Age", "Cinder Age"] {
        let proposal = periods.propose_edit(&fx.ctx(MINION), &period.id, &edit(title)).unwrap();
        periods.approve(&fx.ctx(OWNER), &period.id, proposal.version_number, None).unwrap();
    }
    periods.publish(&fx.ctx(OWNER), &period.id, 1).unwrap();

    let err = periods.publish(&fx.ctx(OWNER), &period.id, 0).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictKind::Superseded));
    let stale = fx.store.period_version(&period.id, 0).unwrap().unwrap();
    assert_eq!(stale.status, VersionStatus::Approved);
    let stored = fx.store.period(&period.id).unwrap().unwrap();
    assert_eq!(stored.title, "Cinder Age");
    assert_eq!(stored.current_version_number, 1);
}

#[test]
fn rejected_period_proposal_can_be_reopened() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    periods.propose_edit(&fx.ctx(MINION), &period.id, &edit("Ember Age")).unwrap();

    let err = periods.restore_rejected(&fx.ctx(OWNER), &period.id, 0).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotRejected));

    periods.reject(&fx.ctx(OWNER), &period.id, 0, Some("later".to_string())).unwrap();
    let err = periods.restore_rejected(&fx.ctx(OUTSIDER), &period.id, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let reopened = periods.restore_rejected(&fx.ctx(MINION), &period.id, 0).unwrap();
    assert_eq!(reopened.status, VersionStatus::Pending);

    periods.approve(&fx.ctx(OWNER), &period.id, 0, None).unwrap();
    periods.publish(&fx.ctx(OWNER), &period.id, 0).unwrap();
    assert_eq!(fx.store.period(&period.id).unwrap().unwrap().title, "Ember Age");
}

#[test]
fn retouch_prefills_new_period_proposal() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    let mut change = edit("Ember Age");
    change.metadata = Some(json!({ "ruler": "Queen Ilse" }));
    periods.propose_edit(&fx.ctx(MINION), &period.id, &change).unwrap();

    let err = periods.retouch(&fx.ctx(MINION), &period.id, 0, None, None).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotRejected));

    periods.reject(&fx.ctx(OWNER), &period.id, 0, None).unwrap();
    let retouched = periods
        .retouch(&fx.ctx(MINION), &period.id, 0, Some("Embers".to_string()), None)
        .unwrap();
    assert_eq!(retouched.version_number, 1);
    assert_eq!(retouched.status, VersionStatus::Pending);
    assert_eq!(retouched.action, Action::Edit);
    assert_eq!(retouched.proposed_title, "Embers");
    assert_eq!(retouched.proposed_description, "Ember Age chronicle");
    assert_eq!(retouched.proposed_metadata.property("ruler"), Some("Queen Ilse"));
    let source = fx.store.period_version(&period.id, 0).unwrap().unwrap();
    assert_eq!(source.status, VersionStatus::Rejected);
}

#[test]
fn revert_to_proposes_earlier_period_snapshot() {
    let fx = Fixture::with_cast();
    let world = fx.world(OWNER, "Aster");
    let periods = fx.engine.periods();
    let period = create(&fx, &world.hid, "Age of Ash");
    for (number, title) in [(0, "Ember Age"), (1, "Cinder Age")] {
        periods.propose_edit(&fx.ctx(MINION), &period.id, &edit(title)).unwrap();
        periods.approve(&fx.ctx(OWNER), &period.id, number, None).unwrap();
        periods.publish(&fx.ctx(OWNER), &period.id, number).unwrap();
    }
    let pending = periods.propose_edit(&fx.ctx(MINION), &period.id, &edit("Ash")).unwrap();
    let err = periods.revert_to(&fx.ctx(MINION), &period.id, pending.version_number).unwrap_err();
    assert_eq!(err.transition(), Some(TransitionError::NotRestorable));

    let reverted = periods.revert_to(&fx.ctx(MINION), &period.id, 0).unwrap();
    assert_eq!(reverted.action, Action::Edit);
    assert_eq!(reverted.proposed_title, "Ember Age");
    assert_eq!(reverted.change_log, "restore of version 0");
    let original = periods.revert_to(&fx.ctx(MINION), &period.id, SEED_VERSION_NUMBER).unwrap();
    assert_eq!(original.proposed_title, "Age of Ash");

    periods.approve(&fx.ctx(OWNER), &period.id, original.version_number, None).unwrap();
    periods.publish(&fx.ctx(OWNER), &period.id, original.version_number).unwrap();
    let stored = fx.store.period(&period.id).unwrap().unwrap();
    assert_eq!(stored.title, "Age of Ash");
    assert_eq!(stored.slug, "age-of-ash");
}
