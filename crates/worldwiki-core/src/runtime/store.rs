// worldwiki-core/src/runtime/store.rs
// ============================================================================
// Module: Worldwiki In-Memory Store
// Description: Mutex-guarded in-memory wiki store for tests and embedding.
// Purpose: Provide a deterministic store with the same batch semantics as durable backends.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryWikiStore`] keeps every table in ordered maps behind one mutex.
//! A commit checks all preconditions, applies the writes in place while
//! journaling the prior value of every touched row, and re-checks the
//! relational constraints a SQL schema would enforce on those rows. A failed
//! check replays the journal backwards, so a failed commit leaves no trace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Actor;
use crate::core::ActorId;
use crate::core::Entity;
use crate::core::Hid;
use crate::core::PeriodId;
use crate::core::PeriodVersion;
use crate::core::PublicId;
use crate::core::TimelinePeriod;
use crate::core::Version;
use crate::interfaces::ActorStore;
use crate::interfaces::EntityQuery;
use crate::interfaces::EntityStore;
use crate::interfaces::PeriodStore;
use crate::interfaces::Precondition;
use crate::interfaces::StoreError;
use crate::interfaces::VersionQuery;
use crate::interfaces::VersionStore;
use crate::interfaces::WikiStore;
use crate::interfaces::WriteBatch;
use crate::interfaces::WriteOp;

// ============================================================================
// SECTION: State
// ============================================================================

/// Tables held by the in-memory store.
#[derive(Debug, Default)]
struct WikiTables {
    /// Entities keyed by HID.
    entities: BTreeMap<Hid, Entity>,
    /// Versions keyed by HID and number.
    versions: BTreeMap<(Hid, u64), Version>,
    /// Periods keyed by identifier.
    periods: BTreeMap<PeriodId, TimelinePeriod>,
    /// Period versions keyed by period and number.
    period_versions: BTreeMap<(PeriodId, i64), PeriodVersion>,
    /// Actors keyed by identity.
    actors: BTreeMap<ActorId, Actor>,
}

/// In-memory wiki store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWikiStore {
    /// Tables protected by a mutex.
    tables: Arc<Mutex<WikiTables>>,
}

impl InMemoryWikiStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(WikiTables::default())),
        }
    }

    /// Runs a closure against the locked tables.
    fn with_tables<T>(&self, f: impl FnOnce(&WikiTables) -> T) -> Result<T, StoreError> {
        let guard = self
            .tables
            .lock()
            .map_err(|_| StoreError::Store("wiki store mutex poisoned".to_string()))?;
        Ok(f(&guard))
    }
}

// ============================================================================
// SECTION: Read Traits
// ============================================================================

impl EntityStore for InMemoryWikiStore {
    fn entity(&self, hid: &Hid) -> Result<Option<Entity>, StoreError> {
        self.with_tables(|tables| tables.entities.get(hid).cloned())
    }

    fn entity_by_public_id(&self, public_id: &PublicId) -> Result<Option<Entity>, StoreError> {
        self.with_tables(|tables| {
            tables.entities.values().find(|entity| entity.public_id == *public_id).cloned()
        })
    }

    fn query_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, StoreError> {
        self.with_tables(|tables| {
            tables.entities.values().filter(|entity| query.matches(entity)).cloned().collect()
        })
    }
}

impl VersionStore for InMemoryWikiStore {
    fn version(&self, hid: &Hid, number: u64) -> Result<Option<Version>, StoreError> {
        self.with_tables(|tables| tables.versions.get(&(hid.clone(), number)).cloned())
    }

    fn versions(&self, hid: &Hid) -> Result<Vec<Version>, StoreError> {
        self.with_tables(|tables| {
            tables
                .versions
                .range((hid.clone(), 0)..=(hid.clone(), u64::MAX))
                .map(|(_, version)| version.clone())
                .collect()
        })
    }

    fn query_versions(&self, query: &VersionQuery) -> Result<Vec<Version>, StoreError> {
        self.with_tables(|tables| {
            tables
                .versions
                .values()
                .filter(|version| {
                    let owner = tables.entities.get(&version.hid).and_then(|e| e.author.as_ref());
                    query.matches(version, owner)
                })
                .cloned()
                .collect()
        })
    }
}

impl PeriodStore for InMemoryWikiStore {
    fn period(&self, id: &PeriodId) -> Result<Option<TimelinePeriod>, StoreError> {
        self.with_tables(|tables| tables.periods.get(id).cloned())
    }

    fn periods(&self, hid: &Hid) -> Result<Vec<TimelinePeriod>, StoreError> {
        self.with_tables(|tables| {
            let mut periods: Vec<TimelinePeriod> =
                tables.periods.values().filter(|period| period.hid == *hid).cloned().collect();
            sort_periods(&mut periods);
            periods
        })
    }

    fn period_version(
        &self,
        id: &PeriodId,
        number: i64,
    ) -> Result<Option<PeriodVersion>, StoreError> {
        self.with_tables(|tables| tables.period_versions.get(&(id.clone(), number)).cloned())
    }

    fn period_versions(&self, id: &PeriodId) -> Result<Vec<PeriodVersion>, StoreError> {
        self.with_tables(|tables| {
            tables
                .period_versions
                .range((id.clone(), i64::MIN)..=(id.clone(), i64::MAX))
                .map(|(_, version)| version.clone())
                .collect()
        })
    }
}

impl ActorStore for InMemoryWikiStore {
    fn actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        self.with_tables(|tables| tables.actors.get(id).cloned())
    }

    fn actors(&self) -> Result<Vec<Actor>, StoreError> {
        self.with_tables(|tables| tables.actors.values().cloned().collect())
    }
}

// ============================================================================
// SECTION: Commit
// ============================================================================

impl WikiStore for InMemoryWikiStore {
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| StoreError::Store("wiki store mutex poisoned".to_string()))?;
        for precondition in &batch.preconditions {
            check_precondition(&guard, precondition)?;
        }
        let mut journal = Vec::new();
        for op in &batch.writes {
            apply_write(&mut guard, op, &mut journal);
        }
        let checked = check_touched(&guard, &journal);
        if checked.is_err() {
            rollback(&mut guard, journal);
        }
        drop(guard);
        checked
    }
}

/// Orders periods by `(order, created_at, id)`.
fn sort_periods(periods: &mut [TimelinePeriod]) {
    periods.sort_by(|left, right| {
        (left.order, left.created_at, &left.id).cmp(&(right.order, right.created_at, &right.id))
    });
}

/// Checks one precondition against committed state.
fn check_precondition(tables: &WikiTables, precondition: &Precondition) -> Result<(), StoreError> {
    let holds = match precondition {
        Precondition::EntityAbsent(hid) => !tables.entities.contains_key(hid),
        Precondition::PublicIdAbsent(public_id) => {
            !tables.entities.values().any(|entity| entity.public_id == *public_id)
        }
        Precondition::EntityRevision {
            hid,
            revision,
        } => tables.entities.get(hid).is_some_and(|entity| entity.revision == *revision),
        Precondition::VersionAbsent {
            hid,
            number,
        } => !tables.versions.contains_key(&(hid.clone(), *number)),
        Precondition::VersionStatus {
            hid,
            number,
            status,
        } => tables
            .versions
            .get(&(hid.clone(), *number))
            .is_some_and(|version| version.status == *status),
        Precondition::PeriodSlugAbsent {
            hid,
            slug,
        } => !tables.periods.values().any(|period| period.hid == *hid && period.slug == *slug),
        Precondition::PeriodRevision {
            id,
            revision,
        } => tables.periods.get(id).is_some_and(|period| period.revision == *revision),
        Precondition::PeriodAbsent(id) => !tables.periods.contains_key(id),
        Precondition::PeriodVersionAbsent {
            id,
            number,
        } => !tables.period_versions.contains_key(&(id.clone(), *number)),
        Precondition::PeriodVersionStatus {
            id,
            number,
            status,
        } => tables
            .period_versions
            .get(&(id.clone(), *number))
            .is_some_and(|version| version.status == *status),
        Precondition::ActorAbsent(id) => !tables.actors.contains_key(id),
    };
    if holds {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!("precondition failed: {precondition}")))
    }
}

/// Prior value of one row touched by a commit.
enum Undo {
    /// Entity row before the write.
    Entity(Hid, Option<Entity>),
    /// Version row before the write.
    Version((Hid, u64), Option<Version>),
    /// Period row before the write.
    Period(PeriodId, Option<TimelinePeriod>),
    /// Period version row before the write.
    PeriodVersion((PeriodId, i64), Option<PeriodVersion>),
    /// Actor row before the write.
    Actor(ActorId, Option<Actor>),
}

/// Applies one write in place and journals every row it replaces.
fn apply_write(tables: &mut WikiTables, op: &WriteOp, journal: &mut Vec<Undo>) {
    match op {
        WriteOp::PutEntity(entity) => {
            let prior = tables.entities.insert(entity.hid.clone(), entity.clone());
            journal.push(Undo::Entity(entity.hid.clone(), prior));
        }
        WriteOp::DeleteEntity(hid) => {
            let prior = tables.entities.remove(hid);
            journal.push(Undo::Entity(hid.clone(), prior));
            let versions: Vec<(Hid, u64)> = tables
                .versions
                .range((hid.clone(), 0)..=(hid.clone(), u64::MAX))
                .map(|(key, _)| key.clone())
                .collect();
            for key in versions {
                let prior = tables.versions.remove(&key);
                journal.push(Undo::Version(key, prior));
            }
            let periods: Vec<PeriodId> = tables
                .periods
                .values()
                .filter(|period| period.hid == *hid)
                .map(|period| period.id.clone())
                .collect();
            for id in &periods {
                remove_period(tables, id, journal);
            }
        }
        WriteOp::PutVersion(version) => {
            let key = (version.hid.clone(), version.version_number);
            let prior = tables.versions.insert(key.clone(), version.clone());
            journal.push(Undo::Version(key, prior));
        }
        WriteOp::PutPeriod(period) => {
            let prior = tables.periods.insert(period.id.clone(), period.clone());
            journal.push(Undo::Period(period.id.clone(), prior));
        }
        WriteOp::DeletePeriod(id) => remove_period(tables, id, journal),
        WriteOp::PutPeriodVersion(version) => {
            let key = (version.period_id.clone(), version.version_number);
            let prior = tables.period_versions.insert(key.clone(), version.clone());
            journal.push(Undo::PeriodVersion(key, prior));
        }
        WriteOp::PutActor(actor) => {
            let prior = tables.actors.insert(actor.id.clone(), actor.clone());
            journal.push(Undo::Actor(actor.id.clone(), prior));
        }
        WriteOp::DeleteActor(id) => {
            let prior = tables.actors.remove(id);
            journal.push(Undo::Actor(id.clone(), prior));
            for actor in tables.actors.values_mut() {
                if actor.bosses.contains(id) {
                    journal.push(Undo::Actor(actor.id.clone(), Some(actor.clone())));
                    actor.bosses.remove(id);
                }
            }
        }
    }
}

/// Removes a period and its versions, journaling each row.
fn remove_period(tables: &mut WikiTables, id: &PeriodId, journal: &mut Vec<Undo>) {
    let prior = tables.periods.remove(id);
    journal.push(Undo::Period(id.clone(), prior));
    let versions: Vec<(PeriodId, i64)> = tables
        .period_versions
        .range((id.clone(), i64::MIN)..=(id.clone(), i64::MAX))
        .map(|(key, _)| key.clone())
        .collect();
    for key in versions {
        let prior = tables.period_versions.remove(&key);
        journal.push(Undo::PeriodVersion(key, prior));
    }
}

/// Restores journaled rows newest first.
fn rollback(tables: &mut WikiTables, journal: Vec<Undo>) {
    for undo in journal.into_iter().rev() {
        match undo {
            Undo::Entity(hid, prior) => restore(&mut tables.entities, hid, prior),
            Undo::Version(key, prior) => restore(&mut tables.versions, key, prior),
            Undo::Period(id, prior) => restore(&mut tables.periods, id, prior),
            Undo::PeriodVersion(key, prior) => restore(&mut tables.period_versions, key, prior),
            Undo::Actor(id, prior) => restore(&mut tables.actors, id, prior),
        }
    }
}

/// Puts a row back to its journaled value.
fn restore<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, prior: Option<V>) {
    match prior {
        Some(row) => {
            table.insert(key, row);
        }
        None => {
            table.remove(&key);
        }
    }
}

/// Enforces the relational constraints of the durable schema on touched rows.
fn check_touched(tables: &WikiTables, journal: &[Undo]) -> Result<(), StoreError> {
    for undo in journal {
        match undo {
            Undo::Entity(hid, _) => check_entity(tables, hid)?,
            Undo::Version((hid, number), _) => {
                if tables.versions.contains_key(&(hid.clone(), *number))
                    && !tables.entities.contains_key(hid)
                {
                    return Err(StoreError::Invalid(format!(
                        "version {hid}/{number} has no entity"
                    )));
                }
            }
            Undo::Period(id, _) => check_period(tables, id)?,
            Undo::PeriodVersion((id, number), _) => {
                if tables.period_versions.contains_key(&(id.clone(), *number))
                    && !tables.periods.contains_key(id)
                {
                    return Err(StoreError::Invalid(format!(
                        "period version {id}/{number} has no period"
                    )));
                }
            }
            Undo::Actor(..) => {}
        }
    }
    Ok(())
}

/// Rejects a stored entity whose public id another entity already holds.
fn check_entity(tables: &WikiTables, hid: &Hid) -> Result<(), StoreError> {
    let Some(entity) = tables.entities.get(hid) else {
        return Ok(());
    };
    let duplicate = tables
        .entities
        .values()
        .any(|other| other.hid != entity.hid && other.public_id == entity.public_id);
    if duplicate {
        return Err(StoreError::Conflict(format!("duplicate public id {}", entity.public_id)));
    }
    Ok(())
}

/// Checks a stored period's owner, slug uniqueness, and single current flag.
fn check_period(tables: &WikiTables, id: &PeriodId) -> Result<(), StoreError> {
    let Some(period) = tables.periods.get(id) else {
        return Ok(());
    };
    if !tables.entities.contains_key(&period.hid) {
        return Err(StoreError::Invalid(format!("period {} has no entity", period.id)));
    }
    let siblings =
        tables.periods.values().filter(|other| other.hid == period.hid && other.id != *id);
    for other in siblings {
        if other.slug == period.slug {
            return Err(StoreError::Conflict(format!(
                "duplicate period slug {} for {}",
                period.slug, period.hid
            )));
        }
        if period.is_current && other.is_current {
            return Err(StoreError::Conflict(format!(
                "multiple current periods for {}",
                period.hid
            )));
        }
    }
    Ok(())
}
