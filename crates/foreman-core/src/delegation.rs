//! Delegation engine — fans a user message out to a team and folds the
//! responses into one project-manager reply.
//!
//! Per-agent generation failures never abort a request: a failing agent's
//! slot is filled with a deterministic placeholder, and a failing manager
//! preface falls back to a fixed sentence. Availability of a reply wins
//! over strict error propagation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::catalog::ModelCatalog;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::providers::{ProviderAdapter, ProviderRegistry};
use crate::roster::Roster;
use crate::transcript::Transcript;
use crate::types::{Agent, Credential, EnabledModel, SenderKind};

/// Placeholder when an agent's model, credential, or provider no longer
/// resolves (e.g. its model was disabled after binding).
pub const PLACEHOLDER_UNCONFIGURED: &str = "Unable to respond: agent model is not configured.";
/// Placeholder when the provider call itself fails.
pub const PLACEHOLDER_FAILED: &str = "Unable to respond: model generation failed.";
/// Placeholder when the provider call exceeds the engine timeout.
pub const PLACEHOLDER_TIMED_OUT: &str = "Unable to respond: model generation timed out.";
/// Manager preface used when the manager's own generation fails.
pub const MANAGER_FALLBACK: &str = "Delegating your request to the team.";

/// Tuning knobs for the fan-out step.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Agent generations in flight at once.
    pub max_concurrent: usize,
    /// Upper bound on a single generation, resolution included.
    pub generate_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            generate_timeout_secs: 60,
        }
    }
}

/// What a processed message produced: the aggregate reply text and the id
/// of its persisted transcript message.
#[derive(Debug, Clone)]
pub struct DelegationOutcome {
    pub message_id: String,
    pub reply: String,
}

/// The orchestrator. Owner identity is an explicit parameter on every
/// call, never ambient state.
pub struct DelegationEngine {
    roster: Arc<Roster>,
    catalog: Arc<ModelCatalog>,
    credentials: Arc<CredentialStore>,
    registry: Arc<ProviderRegistry>,
    transcript: Arc<Transcript>,
    config: EngineConfig,
    /// Serializes processing per team so a user message and its reply land
    /// adjacent in the transcript even under concurrent sends.
    team_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DelegationEngine {
    pub fn new(
        roster: Arc<Roster>,
        catalog: Arc<ModelCatalog>,
        credentials: Arc<CredentialStore>,
        registry: Arc<ProviderRegistry>,
        transcript: Arc<Transcript>,
        config: EngineConfig,
    ) -> Self {
        Self {
            roster,
            catalog,
            credentials,
            registry,
            transcript,
            config,
            team_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process one inbound user message end to end: record it, fan out to
    /// the members, compose the manager reply, record that too.
    pub async fn process(&self, owner: &str, team_id: &str, body: &str) -> Result<DelegationOutcome> {
        let team = self.roster.team(owner, team_id).await?;

        let lock = self.team_lock(&team.id);
        let _guard = lock.lock().await;

        self.transcript
            .append(&team.id, SenderKind::User, owner, body)
            .await?;

        let agents = self.roster.list_agents(owner, &team.id).await?;
        let (managers, members): (Vec<Agent>, Vec<Agent>) =
            agents.into_iter().partition(|a| a.is_manager);
        let manager = managers.into_iter().next().ok_or_else(|| {
            // A team without its manager row violates the creation
            // invariant; surface it as a storage-level inconsistency.
            crate::error::Error::store(format!("team {} has no manager agent", team.id))
        })?;

        let member_replies = self.fan_out(owner, &members, body).await;
        let preface = self.manager_preface(owner, &manager, body).await;
        let reply = compose_reply(&preface, &members, &member_replies);

        let pm_message = self
            .transcript
            .append(&team.id, SenderKind::Manager, &manager.id, &reply)
            .await?;

        info!(
            "processed message for team '{}': {} member(s), reply seq={}",
            team.name,
            members.len(),
            pm_message.seq
        );

        Ok(DelegationOutcome {
            message_id: pm_message.id,
            reply,
        })
    }

    /// Invoke every member concurrently (bounded by the semaphore) and
    /// return their responses in roster order regardless of completion
    /// order. Every slot is filled; failures become placeholders.
    async fn fan_out(&self, owner: &str, members: &[Agent], body: &str) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let timeout = Duration::from_secs(self.config.generate_timeout_secs);

        let mut handles = Vec::with_capacity(members.len());
        for agent in members {
            let catalog = Arc::clone(&self.catalog);
            let credentials = Arc::clone(&self.credentials);
            let registry = Arc::clone(&self.registry);
            let sem = Arc::clone(&semaphore);
            let owner = owner.to_string();
            let agent = agent.clone();
            let body = body.to_string();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                generate_for_agent(&catalog, &credentials, &registry, &owner, &agent, &body, timeout)
                    .await
            }));
        }

        // Awaiting in spawn order reassembles roster order; this is the
        // synchronization barrier before composition.
        let mut replies = Vec::with_capacity(members.len());
        for (handle, agent) in handles.into_iter().zip(members) {
            match handle.await {
                Ok(text) => replies.push(text),
                Err(e) => {
                    warn!("generation task for agent '{}' panicked: {e}", agent.name);
                    replies.push(PLACEHOLDER_FAILED.to_string());
                }
            }
        }
        replies
    }

    /// The manager's own generation, with the fixed fallback so the reply
    /// always has a preface.
    async fn manager_preface(&self, owner: &str, manager: &Agent, body: &str) -> String {
        let timeout = Duration::from_secs(self.config.generate_timeout_secs);
        let preface = generate_for_agent(
            &self.catalog,
            &self.credentials,
            &self.registry,
            owner,
            manager,
            body,
            timeout,
        )
        .await;

        // generate_for_agent never fails outright, but a placeholder is
        // not a useful preface; swap it for the delegation sentence.
        if is_placeholder(&preface) {
            debug!("manager preface fell back for agent '{}'", manager.name);
            MANAGER_FALLBACK.to_string()
        } else {
            preface
        }
    }

    fn team_lock(&self, team_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .team_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            locks
                .entry(team_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

/// Resolve an agent's model → credential → adapter chain.
async fn resolve_agent(
    catalog: &ModelCatalog,
    credentials: &CredentialStore,
    registry: &ProviderRegistry,
    owner: &str,
    agent: &Agent,
) -> Result<(Arc<dyn ProviderAdapter>, Credential, EnabledModel)> {
    let model = catalog.resolve(owner, &agent.model_id).await?;
    let cred = credentials.get(owner, &model.provider).await?;
    let adapter = registry.get(&model.provider)?;
    Ok((adapter, cred, model))
}

/// One agent's contribution. Infallible by design: resolution failures,
/// generation failures, and timeouts all map to deterministic placeholders
/// so the agent's slot in the aggregate is never dropped.
async fn generate_for_agent(
    catalog: &ModelCatalog,
    credentials: &CredentialStore,
    registry: &ProviderRegistry,
    owner: &str,
    agent: &Agent,
    body: &str,
    timeout: Duration,
) -> String {
    let (adapter, cred, model) =
        match resolve_agent(catalog, credentials, registry, owner, agent).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("agent '{}' did not resolve: {e}", agent.name);
                return PLACEHOLDER_UNCONFIGURED.to_string();
            }
        };

    let call = adapter.generate(&cred.secret, &model.model, body, cred.endpoint.as_deref());
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) => {
            debug!("agent '{}' responded via {}/{}", agent.name, model.provider, model.model);
            text
        }
        Ok(Err(e)) => {
            warn!("agent '{}' generation failed: {e}", agent.name);
            PLACEHOLDER_FAILED.to_string()
        }
        Err(_) => {
            warn!("agent '{}' generation timed out after {timeout:?}", agent.name);
            PLACEHOLDER_TIMED_OUT.to_string()
        }
    }
}

fn is_placeholder(text: &str) -> bool {
    text == PLACEHOLDER_UNCONFIGURED || text == PLACEHOLDER_FAILED || text == PLACEHOLDER_TIMED_OUT
}

/// Compose the final reply: manager preface, then one "name: response"
/// line per member in fan-out order.
fn compose_reply(preface: &str, members: &[Agent], replies: &[String]) -> String {
    let lines: Vec<String> = members
        .iter()
        .zip(replies)
        .map(|(agent, reply)| format!("{}: {}", agent.name, reply))
        .collect();
    format!(
        "{preface}\n\nDelegated tasks to your team:\n{}",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn member(name: &str) -> Agent {
        Agent {
            id: format!("agent-{name}"),
            team_id: "team-1".to_string(),
            name: name.to_string(),
            role: None,
            model_id: "model-1".to_string(),
            is_manager: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compose_reply_preserves_member_order() {
        let members = vec![member("A"), member("B")];
        let replies = vec!["alpha".to_string(), "beta".to_string()];
        let reply = compose_reply("On it.", &members, &replies);

        assert!(reply.starts_with("On it.\n\nDelegated tasks to your team:\n"));
        let a = reply.find("A: alpha").unwrap();
        let b = reply.find("B: beta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_compose_reply_keeps_placeholder_slot() {
        let members = vec![member("A"), member("B")];
        let replies = vec![PLACEHOLDER_FAILED.to_string(), "beta".to_string()];
        let reply = compose_reply("On it.", &members, &replies);

        assert!(reply.contains(&format!("A: {PLACEHOLDER_FAILED}")));
        assert!(reply.contains("B: beta"));
    }

    #[test]
    fn test_compose_reply_no_members() {
        let reply = compose_reply(MANAGER_FALLBACK, &[], &[]);
        assert!(reply.starts_with(MANAGER_FALLBACK));
        assert!(reply.ends_with("Delegated tasks to your team:\n"));
    }

    #[test]
    fn test_is_placeholder() {
        assert!(is_placeholder(PLACEHOLDER_FAILED));
        assert!(is_placeholder(PLACEHOLDER_TIMED_OUT));
        assert!(is_placeholder(PLACEHOLDER_UNCONFIGURED));
        assert!(!is_placeholder("a real answer"));
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.generate_timeout_secs, 60);
    }
}
