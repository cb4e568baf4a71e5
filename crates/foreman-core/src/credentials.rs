//! Credential management — one validated secret per (owner, provider)

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::providers::ProviderRegistry;
use crate::store::Store;
use crate::types::Credential;

/// Validates and stores provider credentials. A secret is probed against
/// the live provider before it is ever written; nothing unvalidated lands
/// in the store.
pub struct CredentialStore {
    store: Arc<dyn Store>,
    registry: Arc<ProviderRegistry>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn Store>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    /// Probe the secret, then upsert. A second `set` for the same
    /// (owner, provider) overwrites the previous record.
    pub async fn set(
        &self,
        owner: &str,
        provider: &str,
        secret: &str,
        endpoint: Option<String>,
    ) -> Result<Credential> {
        let adapter = self.registry.get(provider)?;

        if !adapter.validate(secret, endpoint.as_deref()).await {
            warn!("credential probe failed for provider '{provider}' (owner {owner})");
            return Err(Error::InvalidCredential {
                provider: provider.to_string(),
            });
        }

        let cred = Credential::new(owner, adapter.name(), secret, endpoint);
        self.store.upsert_credential(cred.clone()).await?;
        info!("stored credential for provider '{}' (owner {owner})", adapter.name());
        Ok(cred)
    }

    pub async fn get(&self, owner: &str, provider: &str) -> Result<Credential> {
        self.store
            .get_credential(owner, provider)
            .await?
            .ok_or_else(|| Error::not_found(format!("credential for provider '{provider}'")))
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<Credential>> {
        self.store.list_credentials(owner).await
    }
}
