// worldwiki-core/src/lib.rs
// ============================================================================
// Module: Worldwiki Core Library
// Description: Public API surface for the Worldwiki core.
// Purpose: Expose core types, interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Worldwiki core provides the hierarchical identifier space, the versioned
//! proposal workflow, and the role-based visibility policy of a collaborative
//! worldbuilding wiki. It is backend-agnostic: persistence, audit, and
//! notifications plug in through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ActorStore;
pub use interfaces::AuditError;
pub use interfaces::AuditSink;
pub use interfaces::ContentOracle;
pub use interfaces::EntityQuery;
pub use interfaces::EntityStore;
pub use interfaces::GeneratedImage;
pub use interfaces::NotificationError;
pub use interfaces::NotificationSink;
pub use interfaces::OracleDeadlines;
pub use interfaces::OracleError;
pub use interfaces::PeriodStore;
pub use interfaces::Precondition;
pub use interfaces::StoreError;
pub use interfaces::TrashScope;
pub use interfaces::VersionQuery;
pub use interfaces::VersionStore;
pub use interfaces::WikiStore;
pub use interfaces::WriteBatch;
pub use interfaces::WriteOp;
pub use runtime::ActorLifecycle;
pub use runtime::ActorRegistry;
pub use runtime::ChildRequest;
pub use runtime::ConflictKind;
pub use runtime::CreatedChild;
pub use runtime::DeepCreationService;
pub use runtime::ErrorKind;
pub use runtime::GapPlan;
pub use runtime::HierarchyError;
pub use runtime::HierarchyRepository;
pub use runtime::InMemoryAuditLog;
pub use runtime::InMemoryNotificationSink;
pub use runtime::InMemoryWikiStore;
pub use runtime::InheritedProperty;
pub use runtime::NewPeriod;
pub use runtime::NoopAuditSink;
pub use runtime::NoopNotificationSink;
pub use runtime::PeriodEdit;
pub use runtime::PeriodEngine;
pub use runtime::PolicyEngine;
pub use runtime::ProfileDefaults;
pub use runtime::RegistryError;
pub use runtime::RequestContext;
pub use runtime::TransitionError;
pub use runtime::WorkflowConfig;
pub use runtime::WorkflowEngine;
pub use runtime::WorkflowError;
pub use runtime::visible_children;
