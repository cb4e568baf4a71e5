//! foreman-core - Team-of-agents delegation engine
//!
//! This crate provides:
//! - Provider adapters behind a registry (credential probe, model listing,
//!   text generation)
//! - Credential store and enabled-model catalog, validated against live
//!   providers
//! - Team/agent roster with an atomic team-plus-manager creation path
//! - The delegation engine that fans a user message out to a team and
//!   composes one project-manager reply
//! - The append-only transcript and the `Store` persistence seam

pub mod catalog;
pub mod credentials;
pub mod delegation;
pub mod error;
pub mod providers;
pub mod roster;
pub mod store;
pub mod transcript;
pub mod types;

// Re-export main types for convenience
pub use catalog::ModelCatalog;
pub use credentials::CredentialStore;
pub use delegation::{DelegationEngine, DelegationOutcome, EngineConfig};
pub use error::{Error, Result};
pub use providers::{ProviderAdapter, ProviderRegistry};
pub use roster::Roster;
pub use store::Store;
pub use transcript::Transcript;
pub use types::{Agent, Credential, EnabledModel, Message, NewMessage, SenderKind, Team};
