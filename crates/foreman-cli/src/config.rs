use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use foreman_core::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForemanConfig {
    /// Owner identity threaded through every operation. Single-user
    /// installs can leave the default.
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Database location; defaults to foreman.db in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub engine: EngineSection,
}

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            db_path: None,
            engine: EngineSection::default(),
        }
    }
}

fn default_owner() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    EngineConfig::default().max_concurrent
}

fn default_generate_timeout_secs() -> u64 {
    EngineConfig::default().generate_timeout_secs
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            generate_timeout_secs: default_generate_timeout_secs(),
        }
    }
}

impl ForemanConfig {
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p.clone(),
            None => config_dir().join("config.toml"),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("foreman.db"))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrent: self.engine.max_concurrent,
            generate_timeout_secs: self.engine.generate_timeout_secs,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("foreman")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForemanConfig::default();
        assert_eq!(config.owner, "default");
        assert_eq!(config.engine.max_concurrent, 4);
        assert_eq!(config.engine.generate_timeout_secs, 60);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: ForemanConfig = toml::from_str(
            r#"
            owner = "alice"

            [engine]
            generate_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.owner, "alice");
        assert_eq!(config.engine.max_concurrent, 4);
        assert_eq!(config.engine.generate_timeout_secs, 30);
    }
}
