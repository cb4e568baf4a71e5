//! Shared test harness: an in-memory store wired to a scripted provider

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use foreman_core::error::{Error, Result};
use foreman_core::providers::{ProviderAdapter, ProviderRegistry};
use foreman_core::{
    CredentialStore, DelegationEngine, EngineConfig, ModelCatalog, Roster, Store, Transcript,
};
use foreman_store::SqliteStore;

pub const OWNER: &str = "alice";
pub const SECRET: &str = "mock-secret";

/// Scripted provider: a fixed catalog, per-model failure and delay
/// injection, and deterministic echo responses.
#[derive(Debug)]
pub struct MockProvider {
    offered: Vec<String>,
    failing: HashSet<String>,
    slow: HashMap<String, Duration>,
}

impl MockProvider {
    pub fn new(offered: &[&str]) -> Self {
        Self {
            offered: offered.iter().map(|s| s.to_string()).collect(),
            failing: HashSet::new(),
            slow: HashMap::new(),
        }
    }

    pub fn failing(mut self, model: &str) -> Self {
        self.failing.insert(model.to_string());
        self
    }

    pub fn slow(mut self, model: &str, delay: Duration) -> Self {
        self.slow.insert(model.to_string(), delay);
        self
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self, secret: &str, _endpoint: Option<&str>) -> bool {
        secret == SECRET
    }

    async fn list_models(&self, _secret: &str, _endpoint: Option<&str>) -> Result<Vec<String>> {
        Ok(self.offered.clone())
    }

    async fn generate(
        &self,
        _secret: &str,
        model: &str,
        prompt: &str,
        _endpoint: Option<&str>,
    ) -> Result<String> {
        if let Some(delay) = self.slow.get(model) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(model) {
            return Err(Error::GenerationFailed {
                reason: "scripted failure".to_string(),
            });
        }
        Ok(format!("{model} answers: {prompt}"))
    }
}

/// Everything a test needs, wired the way the CLI wires production.
pub struct Harness {
    pub store: Arc<dyn Store>,
    pub credentials: Arc<CredentialStore>,
    pub catalog: Arc<ModelCatalog>,
    pub roster: Arc<Roster>,
    pub transcript: Arc<Transcript>,
    pub engine: Arc<DelegationEngine>,
}

impl Harness {
    pub fn new(provider: MockProvider) -> Self {
        Self::with_config(provider, EngineConfig::default())
    }

    pub fn with_config(provider: MockProvider, config: EngineConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(provider));
        let registry = Arc::new(registry);

        let credentials = Arc::new(CredentialStore::new(Arc::clone(&store), Arc::clone(&registry)));
        let catalog = Arc::new(ModelCatalog::new(Arc::clone(&store), Arc::clone(&registry)));
        let roster = Arc::new(Roster::new(Arc::clone(&store), Arc::clone(&catalog)));
        let transcript = Arc::new(Transcript::new(Arc::clone(&store)));
        let engine = Arc::new(DelegationEngine::new(
            Arc::clone(&roster),
            Arc::clone(&catalog),
            Arc::clone(&credentials),
            Arc::clone(&registry),
            Arc::clone(&transcript),
            config,
        ));

        Self {
            store,
            credentials,
            catalog,
            roster,
            transcript,
            engine,
        }
    }

    /// Store a credential and enable the given models for OWNER.
    pub async fn enable_models(&self, models: &[&str]) -> Vec<String> {
        self.credentials
            .set(OWNER, "mock", SECRET, None)
            .await
            .unwrap();
        let mut ids = Vec::new();
        for model in models {
            let enabled = self.catalog.enable(OWNER, "mock", model).await.unwrap();
            ids.push(enabled.id);
        }
        ids
    }
}
