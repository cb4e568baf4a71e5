//! Domain entities: credentials, enabled models, teams, agents, messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A validated provider credential owned by one user.
/// Unique per (owner, provider); a second `set` overwrites, never duplicates.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub owner: String,
    pub provider: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub endpoint: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        owner: impl Into<String>,
        provider: impl Into<String>,
        secret: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            provider: provider.into(),
            secret: secret.into(),
            endpoint,
            created_at: Utc::now(),
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("provider", &self.provider)
            .field("secret", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// A model the owner has turned on for use by agents.
/// Unique per (owner, provider, model); must be listed by the provider's
/// live catalog at enable time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnabledModel {
    pub id: String,
    pub owner: String,
    pub provider: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl EnabledModel {
    pub fn new(
        owner: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            provider: provider.into(),
            model: model.into(),
            created_at: Utc::now(),
        }
    }
}

/// A team of agents. `manager_id` points at the single project-manager
/// agent, assigned at creation and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub function: Option<String>,
    pub manager_id: String,
    pub created_at: DateTime<Utc>,
}

/// A single agent within a team, bound to exactly one enabled model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub role: Option<String>,
    pub model_id: String,
    pub is_manager: bool,
    pub created_at: DateTime<Utc>,
}

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    User,
    Manager,
    Agent,
}

impl std::fmt::Display for SenderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Manager => write!(f, "manager"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

impl SenderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "manager" => Some(Self::Manager),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }
}

/// An immutable transcript entry. `seq` is store-assigned and strictly
/// monotonic; it breaks timestamp ties so the transcript has a total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub seq: i64,
    pub team_id: String,
    pub sender: SenderKind,
    pub sender_id: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// A message as submitted for appending, before the store assigns
/// its sequence number and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub team_id: String,
    pub sender: SenderKind,
    pub sender_id: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_kind_round_trip() {
        for kind in [SenderKind::User, SenderKind::Manager, SenderKind::Agent] {
            assert_eq!(SenderKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(SenderKind::parse("robot"), None);
    }

    #[test]
    fn test_credential_debug_hides_secret() {
        let cred = Credential::new("alice", "openai", "sk-secret-key", None);
        let debug = format!("{cred:?}");
        assert!(!debug.contains("sk-secret-key"));
        assert!(debug.contains("openai"));
    }

    #[test]
    fn test_credential_serialize_skips_secret() {
        let cred = Credential::new("alice", "openai", "sk-secret-key", None);
        let json = serde_json::to_string(&cred).unwrap();
        assert!(!json.contains("sk-secret-key"));
    }

    #[test]
    fn test_enabled_model_ids_are_unique() {
        let a = EnabledModel::new("alice", "openai", "gpt-4o");
        let b = EnabledModel::new("alice", "openai", "gpt-4o");
        assert_ne!(a.id, b.id);
    }
}
