//! Anthropic adapter — declared but not yet wired to the Messages API.
//!
//! Registered so the provider name is reserved and credentials for it fail
//! validation cleanly instead of panicking call sites.

use async_trait::async_trait;
use tracing::warn;

use super::types::ProviderAdapter;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct AnthropicAdapter;

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn validate(&self, _secret: &str, _endpoint: Option<&str>) -> bool {
        warn!("Anthropic adapter is not implemented; credential probe fails");
        false
    }

    async fn list_models(&self, _secret: &str, _endpoint: Option<&str>) -> Result<Vec<String>> {
        Err(Error::ProviderUnavailable {
            provider: "anthropic".to_string(),
            reason: "adapter not implemented".to_string(),
        })
    }

    async fn generate(
        &self,
        _secret: &str,
        _model: &str,
        _prompt: &str,
        _endpoint: Option<&str>,
    ) -> Result<String> {
        Err(Error::GenerationFailed {
            reason: "anthropic adapter not implemented".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_rejects_everything() {
        let adapter = AnthropicAdapter;
        assert!(!adapter.validate("sk-ant-anything", None).await);
        assert!(matches!(
            adapter.list_models("sk-ant-anything", None).await,
            Err(Error::ProviderUnavailable { .. })
        ));
        assert!(matches!(
            adapter.generate("sk-ant-anything", "claude", "hi", None).await,
            Err(Error::GenerationFailed { .. })
        ));
    }
}
