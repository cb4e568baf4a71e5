//! Registry mapping provider names to adapter instances

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::anthropic::AnthropicAdapter;
use super::openai::OpenAiAdapter;
use super::types::ProviderAdapter;
use crate::error::{Error, Result};

/// Name → adapter dispatch table. Provider names are matched
/// case-insensitively, so "OpenAI" and "openai" resolve to the same
/// adapter.
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with every built-in adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OpenAiAdapter::default()));
        registry.register(Arc::new(AnthropicAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        debug!("registered provider adapter '{}'", adapter.name());
        self.adapters.insert(adapter.name().to_lowercase(), adapter);
    }

    /// Resolve a provider by name; `UnsupportedProvider` when no adapter
    /// has been registered for it.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(&provider.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnsupportedProvider {
                provider: provider.to_string(),
            })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.adapters.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
