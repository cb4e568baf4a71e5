//! Team and agent hierarchy

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::catalog::ModelCatalog;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Agent, Team};

/// Name and role given to the manager agent created with every team.
pub const MANAGER_NAME: &str = "Project Manager";

/// Creates teams and agents and answers membership queries. Every team is
/// born with exactly one manager agent; the pair is inserted atomically so
/// a failure mid-way leaves neither behind.
pub struct Roster {
    store: Arc<dyn Store>,
    catalog: Arc<ModelCatalog>,
}

impl Roster {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<ModelCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Create a team and its manager agent as one unit. `pm_model_id` must
    /// resolve to an enabled model of the same owner.
    pub async fn create_team(
        &self,
        owner: &str,
        name: &str,
        function: Option<String>,
        pm_model_id: &str,
    ) -> Result<Team> {
        let pm_model = self.catalog.resolve(owner, pm_model_id).await?;

        let team_id = Uuid::new_v4().to_string();
        let manager = Agent {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.clone(),
            name: MANAGER_NAME.to_string(),
            role: Some(MANAGER_NAME.to_string()),
            model_id: pm_model.id,
            is_manager: true,
            created_at: Utc::now(),
        };
        let team = Team {
            id: team_id,
            owner: owner.to_string(),
            name: name.to_string(),
            function,
            manager_id: manager.id.clone(),
            created_at: Utc::now(),
        };

        self.store
            .create_team_with_manager(team.clone(), manager)
            .await?;
        info!("created team '{}' ({}) for owner {owner}", team.name, team.id);
        Ok(team)
    }

    /// Add a member agent. Members are never managers; the manager slot is
    /// filled once, at team creation.
    pub async fn add_agent(
        &self,
        owner: &str,
        team_id: &str,
        name: &str,
        role: Option<String>,
        model_id: &str,
    ) -> Result<Agent> {
        let team = self.team(owner, team_id).await?;
        let model = self.catalog.resolve(owner, model_id).await?;

        let agent = Agent {
            id: Uuid::new_v4().to_string(),
            team_id: team.id.clone(),
            name: name.to_string(),
            role,
            model_id: model.id,
            is_manager: false,
            created_at: Utc::now(),
        };
        self.store.insert_agent(agent.clone()).await?;
        info!("added agent '{}' to team '{}'", agent.name, team.name);
        Ok(agent)
    }

    pub async fn team(&self, owner: &str, team_id: &str) -> Result<Team> {
        self.store
            .get_team(owner, team_id)
            .await?
            .ok_or(Error::TeamNotFound)
    }

    pub async fn list_teams(&self, owner: &str) -> Result<Vec<Team>> {
        self.store.list_teams(owner).await
    }

    /// Agents of a team: manager first, then members in creation order.
    pub async fn list_agents(&self, owner: &str, team_id: &str) -> Result<Vec<Agent>> {
        let team = self.team(owner, team_id).await?;
        let mut agents = self.store.list_agents(&team.id).await?;
        // Stable sort: manager floats to the front, members keep the
        // store's creation order.
        agents.sort_by_key(|a| !a.is_manager);
        Ok(agents)
    }
}
