//! Enabled-model catalog — which provider models an owner may bind agents to

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::providers::ProviderRegistry;
use crate::store::Store;
use crate::types::EnabledModel;

/// Tracks which models each owner has enabled. Enabling checks the
/// provider's live catalog every time rather than a cached listing.
pub struct ModelCatalog {
    store: Arc<dyn Store>,
    registry: Arc<ProviderRegistry>,
}

impl ModelCatalog {
    pub fn new(store: Arc<dyn Store>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    /// Enable a model for an owner. Requires a stored credential for the
    /// provider and a live listing that actually offers the model.
    /// Re-enabling an already-enabled model is a no-op success.
    pub async fn enable(&self, owner: &str, provider: &str, model: &str) -> Result<EnabledModel> {
        let cred = self
            .store
            .get_credential(owner, provider)
            .await?
            .ok_or_else(|| Error::not_found(format!("credential for provider '{provider}'")))?;

        let adapter = self.registry.get(provider)?;
        let offered = adapter
            .list_models(&cred.secret, cred.endpoint.as_deref())
            .await?;

        if !offered.iter().any(|m| m == model) {
            warn!("model '{model}' not offered by provider '{provider}'");
            return Err(Error::ModelNotOffered {
                provider: provider.to_string(),
                model: model.to_string(),
            });
        }

        if let Some(existing) = self.store.get_enabled_model(owner, provider, model).await? {
            info!("model '{model}' already enabled for owner {owner}");
            return Ok(existing);
        }

        let enabled = EnabledModel::new(owner, provider, model);
        self.store.insert_enabled_model(enabled.clone()).await?;
        info!("enabled model '{model}' from provider '{provider}' for owner {owner}");
        Ok(enabled)
    }

    /// Remove an enabled model. Deliberately does not check whether any
    /// agent still references it; an agent bound to a disabled model keeps
    /// its now-orphaned model id and fails at delegation time instead.
    pub async fn disable(&self, owner: &str, provider: &str, model: &str) -> Result<()> {
        let removed = self.store.delete_enabled_model(owner, provider, model).await?;
        if !removed {
            return Err(Error::not_found(format!("enabled model '{model}'")));
        }
        info!("disabled model '{model}' from provider '{provider}' for owner {owner}");
        Ok(())
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<EnabledModel>> {
        self.store.list_enabled_models(owner).await
    }

    /// Resolve an enabled-model id for an owner. Ownership is part of the
    /// lookup: a model id belonging to another owner is `ModelNotFound`.
    pub async fn resolve(&self, owner: &str, model_id: &str) -> Result<EnabledModel> {
        self.store
            .get_enabled_model_by_id(owner, model_id)
            .await?
            .ok_or(Error::ModelNotFound)
    }
}
