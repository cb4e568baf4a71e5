//! Provider adapter layer
//!
//! One adapter per model provider, all behind the [`ProviderAdapter`]
//! trait and dispatched through a [`ProviderRegistry`] keyed by provider
//! name — adding a provider means adding one adapter, not editing call
//! sites.

pub mod anthropic;
pub mod openai;
pub mod registry;
pub mod types;

pub use registry::ProviderRegistry;
pub use types::ProviderAdapter;
