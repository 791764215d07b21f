// worldwiki-core/src/runtime/mod.rs
// ============================================================================
// Module: Worldwiki Runtime
// Description: Workflow engine, policy, hierarchy services, and in-memory backends.
// Purpose: Execute wiki intents against a store with consistent authorization.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the proposal workflow, the policy engine, the
//! hierarchy repository, deep creation, and ghost solidification. Every
//! external surface must route mutations through [`WorkflowEngine`] so that
//! authorization and audit stay uniform.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod actors;
pub mod deep;
mod effects;
pub mod engine;
pub mod hierarchy;
pub mod periods;
pub mod policy;
pub mod sinks;
pub mod store;
pub mod tree;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actors::ActorLifecycle;
pub use actors::ActorRegistry;
pub use actors::ProfileDefaults;
pub use actors::RegistryError;
pub use deep::DeepCreationService;
pub use deep::GapPlan;
pub use engine::ChildRequest;
pub use engine::ConflictKind;
pub use engine::CreatedChild;
pub use engine::ErrorKind;
pub use engine::RequestContext;
pub use engine::TransitionError;
pub use engine::WorkflowConfig;
pub use engine::WorkflowEngine;
pub use engine::WorkflowError;
pub use hierarchy::HierarchyError;
pub use hierarchy::HierarchyRepository;
pub use hierarchy::InheritedProperty;
pub use periods::NewPeriod;
pub use periods::PeriodEdit;
pub use periods::PeriodEngine;
pub use policy::PolicyEngine;
pub use sinks::InMemoryAuditLog;
pub use sinks::InMemoryNotificationSink;
pub use sinks::NoopAuditSink;
pub use sinks::NoopNotificationSink;
pub use store::InMemoryWikiStore;
pub use tree::visible_children;
