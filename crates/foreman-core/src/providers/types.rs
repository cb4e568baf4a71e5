//! The contract every model provider must satisfy

use async_trait::async_trait;

use crate::error::Result;

/// Capability set an adapter exposes: probe a credential, list the
/// provider's model catalog, and generate text.
///
/// Credentials are passed per call rather than held by the adapter, so one
/// adapter instance serves every owner. `endpoint` optionally overrides the
/// provider's default base URL.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Provider name as stored on credentials and enabled models
    /// (e.g. "openai").
    fn name(&self) -> &str;

    /// Side-effect-free probe of a secret. Returns false for a rejected
    /// key *and* for transport failures — callers cannot tell "bad key"
    /// from "network down" at this boundary.
    async fn validate(&self, secret: &str, endpoint: Option<&str>) -> bool;

    /// The provider's current model catalog, in the provider's own order.
    async fn list_models(&self, secret: &str, endpoint: Option<&str>) -> Result<Vec<String>>;

    /// Single prompt in, generated text out. No retries at this layer;
    /// the delegation engine owns recovery policy.
    async fn generate(
        &self,
        secret: &str,
        model: &str,
        prompt: &str,
        endpoint: Option<&str>,
    ) -> Result<String>;
}
