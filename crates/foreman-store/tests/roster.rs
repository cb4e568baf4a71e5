//! Team creation atomicity and agent listing order

mod common;

use chrono::Utc;
use common::{Harness, MockProvider, OWNER};
use foreman_core::roster::MANAGER_NAME;
use foreman_core::types::{Agent, Team};
use foreman_core::{Error, Store as _};
use uuid::Uuid;

#[tokio::test]
async fn create_team_creates_exactly_one_manager() {
    let h = Harness::new(MockProvider::new(&["m-pm"]));
    let ids = h.enable_models(&["m-pm"]).await;

    let team = h
        .roster
        .create_team(OWNER, "ops", Some("operations".into()), &ids[0])
        .await
        .unwrap();

    let agents = h.roster.list_agents(OWNER, &team.id).await.unwrap();
    assert_eq!(agents.len(), 1);
    assert!(agents[0].is_manager);
    assert_eq!(agents[0].name, MANAGER_NAME);
    assert_eq!(agents[0].id, team.manager_id);
}

#[tokio::test]
async fn create_team_rejects_unknown_pm_model() {
    let h = Harness::new(MockProvider::new(&["m-pm"]));
    h.enable_models(&["m-pm"]).await;

    let err = h
        .roster
        .create_team(OWNER, "ops", None, "no-such-model-id")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ModelNotFound));
    assert!(h.roster.list_teams(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn team_and_manager_insert_is_atomic() {
    let h = Harness::new(MockProvider::new(&["m-pm"]));
    let ids = h.enable_models(&["m-pm"]).await;

    let existing = h
        .roster
        .create_team(OWNER, "first", None, &ids[0])
        .await
        .unwrap();

    // Drive the store directly with a manager whose id collides with the
    // existing manager row: the second insert of the pair fails, and the
    // team insert that succeeded before it must roll back.
    let team_id = Uuid::new_v4().to_string();
    let manager = Agent {
        id: existing.manager_id.clone(),
        team_id: team_id.clone(),
        name: MANAGER_NAME.to_string(),
        role: Some(MANAGER_NAME.to_string()),
        model_id: ids[0].clone(),
        is_manager: true,
        created_at: Utc::now(),
    };
    let team = Team {
        id: team_id.clone(),
        owner: OWNER.to_string(),
        name: "doomed".to_string(),
        function: None,
        manager_id: manager.id.clone(),
        created_at: Utc::now(),
    };

    let err = h.store.create_team_with_manager(team, manager).await;
    assert!(err.is_err());

    // No orphan team without a manager.
    assert!(h.store.get_team(OWNER, &team_id).await.unwrap().is_none());
    assert_eq!(h.roster.list_teams(OWNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn add_agent_requires_owned_team_and_model() {
    let h = Harness::new(MockProvider::new(&["m-pm", "m-worker"]));
    let ids = h.enable_models(&["m-pm", "m-worker"]).await;
    let team = h.roster.create_team(OWNER, "ops", None, &ids[0]).await.unwrap();

    let err = h
        .roster
        .add_agent(OWNER, "no-such-team", "W", None, &ids[1])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TeamNotFound));

    let err = h
        .roster
        .add_agent("mallory", &team.id, "W", None, &ids[1])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TeamNotFound));

    let err = h
        .roster
        .add_agent(OWNER, &team.id, "W", None, "bogus-model-id")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ModelNotFound));
}

#[tokio::test]
async fn list_agents_is_manager_first_then_creation_order() {
    let h = Harness::new(MockProvider::new(&["m-pm", "m-worker"]));
    let ids = h.enable_models(&["m-pm", "m-worker"]).await;
    let team = h.roster.create_team(OWNER, "ops", None, &ids[0]).await.unwrap();

    h.roster.add_agent(OWNER, &team.id, "A", None, &ids[1]).await.unwrap();
    h.roster.add_agent(OWNER, &team.id, "B", None, &ids[1]).await.unwrap();
    h.roster.add_agent(OWNER, &team.id, "C", None, &ids[1]).await.unwrap();

    let agents = h.roster.list_agents(OWNER, &team.id).await.unwrap();
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec![MANAGER_NAME, "A", "B", "C"]);
    assert!(agents[0].is_manager);
    assert!(agents[1..].iter().all(|a| !a.is_manager));
}
