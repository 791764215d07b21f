// worldwiki-core/src/core/mod.rs
// ============================================================================
// Module: Worldwiki Core Types
// Description: Canonical domain records for the hierarchical wiki.
// Purpose: Provide stable, serializable types shared by every backend.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define hierarchical identifiers, entities, versions, periods,
//! actors, and the audit/notification records emitted by the workflow. They
//! are the canonical source of truth for every store and sink.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod actor;
pub mod audit;
pub mod entity;
pub mod filter;
pub mod hid;
pub mod identifiers;
pub mod metadata;
pub mod period;
pub mod short_code;
pub mod time;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actor::Actor;
pub use actor::ActorDirectory;
pub use actor::Rank;
pub use audit::AuditAction;
pub use audit::AuditEvent;
pub use audit::Notification;
pub use audit::NotificationKind;
pub use entity::Entity;
pub use entity::EntityStatus;
pub use entity::STRUCTURAL_NAME;
pub use filter::ProposalFilter;
pub use filter::ProposalSilo;
pub use filter::VisibilityFilter;
pub use filter::VisibilityRules;
pub use hid::Hid;
pub use hid::HidError;
pub use hid::Level;
pub use hid::build_child;
pub use hid::level_of;
pub use identifiers::ActorId;
pub use identifiers::IdentifierError;
pub use identifiers::PeriodId;
pub use identifiers::PublicId;
pub use metadata::Metadata;
pub use metadata::MetadataError;
pub use metadata::NodeKind;
pub use metadata::Property;
pub use period::PeriodVersion;
pub use period::SEED_VERSION_NUMBER;
pub use period::TimelinePeriod;
pub use period::slugify;
pub use short_code::ShortCodeError;
pub use short_code::decode_compact;
pub use short_code::decode_short;
pub use short_code::encode_compact;
pub use short_code::encode_short;
pub use time::Timestamp;
pub use version::Action;
pub use version::ChangeKind;
pub use version::ChangePayload;
pub use version::Proposal;
pub use version::Version;
pub use version::VersionStatus;
