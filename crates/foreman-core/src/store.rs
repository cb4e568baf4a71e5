//! Persistence seam — every component reads and writes rows through this
//! trait, never a concrete engine. `foreman-store` provides the SQLite
//! implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Agent, Credential, EnabledModel, Message, NewMessage, Team};

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or overwrite the one credential for (owner, provider).
    async fn upsert_credential(&self, cred: Credential) -> Result<()>;
    async fn get_credential(&self, owner: &str, provider: &str) -> Result<Option<Credential>>;
    async fn list_credentials(&self, owner: &str) -> Result<Vec<Credential>>;

    async fn insert_enabled_model(&self, model: EnabledModel) -> Result<()>;
    async fn get_enabled_model(
        &self,
        owner: &str,
        provider: &str,
        model: &str,
    ) -> Result<Option<EnabledModel>>;
    async fn get_enabled_model_by_id(&self, owner: &str, id: &str)
        -> Result<Option<EnabledModel>>;
    /// Returns false when no matching row existed.
    async fn delete_enabled_model(&self, owner: &str, provider: &str, model: &str) -> Result<bool>;
    async fn list_enabled_models(&self, owner: &str) -> Result<Vec<EnabledModel>>;

    /// Insert a team and its manager agent as one atomic unit. If either
    /// insert fails the store must leave neither row behind.
    async fn create_team_with_manager(&self, team: Team, manager: Agent) -> Result<()>;
    async fn get_team(&self, owner: &str, team_id: &str) -> Result<Option<Team>>;
    async fn list_teams(&self, owner: &str) -> Result<Vec<Team>>;

    async fn insert_agent(&self, agent: Agent) -> Result<()>;
    /// Agents of a team in creation order. Manager-first reordering is the
    /// roster's concern, not the store's.
    async fn list_agents(&self, team_id: &str) -> Result<Vec<Agent>>;
    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>>;

    /// Append one transcript message; the store assigns the timestamp and a
    /// strictly monotonic sequence number. Appends are atomic: two
    /// concurrent appends never produce equal sequence numbers.
    async fn append_message(&self, msg: NewMessage) -> Result<Message>;
    async fn list_messages(&self, team_id: &str) -> Result<Vec<Message>>;
}
