// worldwiki-core/src/runtime/actors.rs
// ============================================================================
// Module: Worldwiki Actor Registry
// Description: Actor registration, supervision links, and protected deletion.
// Purpose: Persist actors through the store with an explicit creation hook.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! Registration runs an [`ActorLifecycle::on_create`] hook before the actor
//! is persisted, replacing implicit profile-creation callbacks with an
//! explicit step. Supervision edges are directed: assigning a boss never
//! makes the minion a boss of anyone. Superusers and configured protected
//! identities cannot be deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::Actor;
use crate::core::ActorDirectory;
use crate::core::ActorId;
use crate::interfaces::Precondition;
use crate::interfaces::StoreError;
use crate::interfaces::WikiStore;
use crate::interfaces::WriteBatch;
use crate::interfaces::WriteOp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Avatar assigned to actors registered without one.
pub const DEFAULT_AVATAR: &str = "default_avatar.png";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Actor registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Actor identity already registered.
    #[error("actor already registered: {0}")]
    Duplicate(ActorId),
    /// Actor identity unknown.
    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),
    /// Actor is protected from deletion.
    #[error("actor {0} is protected and cannot be deleted")]
    ProtectedActor(ActorId),
    /// An actor cannot supervise itself.
    #[error("actor {0} cannot supervise itself")]
    SelfSupervision(ActorId),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Hook invoked on actor lifecycle events.
pub trait ActorLifecycle {
    /// Adjusts a new actor before it is persisted.
    fn on_create(&self, actor: &mut Actor);
}

/// Lifecycle hook that fills profile defaults.
#[derive(Debug, Clone, Default)]
pub struct ProfileDefaults {
    /// Avatar assigned when the actor has none.
    pub avatar: Option<String>,
}

impl ActorLifecycle for ProfileDefaults {
    fn on_create(&self, actor: &mut Actor) {
        if actor.avatar.is_none() {
            actor.avatar = Some(self.avatar.clone().unwrap_or_else(|| DEFAULT_AVATAR.to_string()));
        }
        actor.bosses.remove(&actor.id);
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Actor registry over a wiki store.
pub struct ActorRegistry<S, L = ProfileDefaults> {
    /// Backing store.
    store: S,
    /// Lifecycle hook.
    lifecycle: L,
    /// Identities that may never be deleted.
    protected: BTreeSet<ActorId>,
}

impl<S: WikiStore> ActorRegistry<S, ProfileDefaults> {
    /// Creates a registry with default profile handling.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_lifecycle(store, ProfileDefaults::default())
    }
}

impl<S: WikiStore, L: ActorLifecycle> ActorRegistry<S, L> {
    /// Creates a registry with a custom lifecycle hook.
    #[must_use]
    pub fn with_lifecycle(store: S, lifecycle: L) -> Self {
        Self {
            store,
            lifecycle,
            protected: BTreeSet::new(),
        }
    }

    /// Returns a copy protecting the given identities from deletion.
    #[must_use]
    pub fn with_protected(mut self, protected: impl IntoIterator<Item = ActorId>) -> Self {
        self.protected.extend(protected);
        self
    }

    /// Registers a new actor after running the creation hook.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the identity is taken.
    pub fn register(&self, mut actor: Actor) -> Result<Actor, RegistryError> {
        self.lifecycle.on_create(&mut actor);
        let mut batch = WriteBatch::new();
        batch
            .require(Precondition::ActorAbsent(actor.id.clone()))
            .write(WriteOp::PutActor(actor.clone()));
        match self.store.commit(&batch) {
            Ok(()) => Ok(actor),
            Err(StoreError::Conflict(_)) => Err(RegistryError::Duplicate(actor.id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Adds `boss` to the bosses of `minion`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when either actor is unknown or the link is
    /// reflexive.
    pub fn assign_boss(&self, minion: &ActorId, boss: &ActorId) -> Result<Actor, RegistryError> {
        if minion == boss {
            return Err(RegistryError::SelfSupervision(minion.clone()));
        }
        if self.store.actor(boss)?.is_none() {
            return Err(RegistryError::UnknownActor(boss.clone()));
        }
        self.update(minion, |actor| {
            actor.bosses.insert(boss.clone());
        })
    }

    /// Removes `boss` from the bosses of `minion`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownActor`] when the minion is unknown.
    pub fn remove_boss(&self, minion: &ActorId, boss: &ActorId) -> Result<Actor, RegistryError> {
        self.update(minion, |actor| {
            actor.bosses.remove(boss);
        })
    }

    /// Deletes an actor and every supervision edge pointing at it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ProtectedActor`] for superusers and protected
    /// identities.
    pub fn delete(&self, id: &ActorId) -> Result<(), RegistryError> {
        let actor = self.store.actor(id)?.ok_or_else(|| RegistryError::UnknownActor(id.clone()))?;
        if actor.is_superuser || self.protected.contains(id) {
            return Err(RegistryError::ProtectedActor(id.clone()));
        }
        let mut batch = WriteBatch::new();
        batch.write(WriteOp::DeleteActor(id.clone()));
        self.store.commit(&batch)?;
        Ok(())
    }

    /// Loads an actor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] when loading fails.
    pub fn get(&self, id: &ActorId) -> Result<Option<Actor>, RegistryError> {
        Ok(self.store.actor(id)?)
    }

    /// Builds a policy snapshot of every registered actor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] when loading fails.
    pub fn directory(&self) -> Result<ActorDirectory, RegistryError> {
        Ok(self.store.directory()?)
    }

    /// Rewrites one actor.
    fn update(
        &self,
        id: &ActorId,
        change: impl FnOnce(&mut Actor),
    ) -> Result<Actor, RegistryError> {
        let mut actor =
            self.store.actor(id)?.ok_or_else(|| RegistryError::UnknownActor(id.clone()))?;
        change(&mut actor);
        let mut batch = WriteBatch::new();
        batch.write(WriteOp::PutActor(actor.clone()));
        self.store.commit(&batch)?;
        Ok(actor)
    }
}
