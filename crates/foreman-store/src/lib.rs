//! SQLite implementation of the foreman `Store` trait
//!
//! Thread-safe via `Arc<Mutex<Connection>>`; every call runs on the
//! blocking pool. The connection mutex makes each store operation atomic,
//! which is what gives transcript appends their no-interleaving guarantee.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use foreman_core::error::{Error, Result};
use foreman_core::store::Store;
use foreman_core::types::{Agent, Credential, EnabledModel, Message, NewMessage, SenderKind, Team};

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and initialize the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| Error::Store(format!("failed to open database: {e}")))?;
        info!("opening foreman database at {:?}", path.as_ref());
        Self::init(conn)
    }

    /// In-memory database, used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Store(format!("failed to open in-memory database: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS credentials (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                provider TEXT NOT NULL,
                secret TEXT NOT NULL,
                endpoint TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(owner, provider)
            );

            CREATE TABLE IF NOT EXISTS enabled_models (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(owner, provider, model)
            );

            CREATE TABLE IF NOT EXISTS teams (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                function TEXT,
                manager_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- No foreign key on model_id: disabling a model leaves agent
            -- rows pointing at the orphaned id, by design.
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                team_id TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT,
                model_id TEXT NOT NULL,
                is_manager INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY(team_id) REFERENCES teams(id)
            );

            -- seq doubles as the transcript tie-breaker: AUTOINCREMENT
            -- never reuses or reorders values.
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                team_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                body TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                FOREIGN KEY(team_id) REFERENCES teams(id)
            );

            CREATE INDEX IF NOT EXISTS idx_credentials_owner ON credentials(owner);
            CREATE INDEX IF NOT EXISTS idx_enabled_models_owner ON enabled_models(owner);
            CREATE INDEX IF NOT EXISTS idx_teams_owner ON teams(owner);
            CREATE INDEX IF NOT EXISTS idx_agents_team ON agents(team_id);
            CREATE INDEX IF NOT EXISTS idx_messages_team ON messages(team_id);",
        )
        .map_err(Error::store)?;

        debug!("database schema initialized");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::Store(format!("blocking task panicked: {e}")))?
        .map_err(Error::store)
    }
}

fn row_to_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<Credential> {
    Ok(Credential {
        id: row.get(0)?,
        owner: row.get(1)?,
        provider: row.get(2)?,
        secret: row.get(3)?,
        endpoint: row.get(4)?,
        created_at: row.get::<_, String>(5)?.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_enabled_model(row: &rusqlite::Row<'_>) -> rusqlite::Result<EnabledModel> {
    Ok(EnabledModel {
        id: row.get(0)?,
        owner: row.get(1)?,
        provider: row.get(2)?,
        model: row.get(3)?,
        created_at: row.get::<_, String>(4)?.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_team(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        function: row.get(3)?,
        manager_id: row.get(4)?,
        created_at: row.get::<_, String>(5)?.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        model_id: row.get(4)?,
        is_manager: row.get::<_, i64>(5)? != 0,
        created_at: row.get::<_, String>(6)?.parse().unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let sender_str: String = row.get(3)?;
    let sender = SenderKind::parse(&sender_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown sender kind '{sender_str}'").into(),
        )
    })?;
    Ok(Message {
        seq: row.get(0)?,
        id: row.get(1)?,
        team_id: row.get(2)?,
        sender,
        sender_id: row.get(4)?,
        body: row.get(5)?,
        timestamp: row.get::<_, String>(6)?.parse().unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_credential(&self, cred: Credential) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO credentials (id, owner, provider, secret, endpoint, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(owner, provider) DO UPDATE SET
                     secret = excluded.secret,
                     endpoint = excluded.endpoint",
                params![
                    &cred.id,
                    &cred.owner,
                    &cred.provider,
                    &cred.secret,
                    &cred.endpoint,
                    cred.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_credential(&self, owner: &str, provider: &str) -> Result<Option<Credential>> {
        let owner = owner.to_owned();
        let provider = provider.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, owner, provider, secret, endpoint, created_at
                 FROM credentials WHERE owner = ?1 AND provider = ?2",
                params![&owner, &provider],
                row_to_credential,
            )
            .optional()
        })
        .await
    }

    async fn list_credentials(&self, owner: &str) -> Result<Vec<Credential>> {
        let owner = owner.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner, provider, secret, endpoint, created_at
                 FROM credentials WHERE owner = ?1 ORDER BY provider",
            )?;
            let rows = stmt.query_map(params![&owner], row_to_credential)?;
            rows.collect()
        })
        .await
    }

    async fn insert_enabled_model(&self, model: EnabledModel) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO enabled_models (id, owner, provider, model, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &model.id,
                    &model.owner,
                    &model.provider,
                    &model.model,
                    model.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_enabled_model(
        &self,
        owner: &str,
        provider: &str,
        model: &str,
    ) -> Result<Option<EnabledModel>> {
        let owner = owner.to_owned();
        let provider = provider.to_owned();
        let model = model.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, owner, provider, model, created_at
                 FROM enabled_models WHERE owner = ?1 AND provider = ?2 AND model = ?3",
                params![&owner, &provider, &model],
                row_to_enabled_model,
            )
            .optional()
        })
        .await
    }

    async fn get_enabled_model_by_id(
        &self,
        owner: &str,
        id: &str,
    ) -> Result<Option<EnabledModel>> {
        let owner = owner.to_owned();
        let id = id.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, owner, provider, model, created_at
                 FROM enabled_models WHERE id = ?1 AND owner = ?2",
                params![&id, &owner],
                row_to_enabled_model,
            )
            .optional()
        })
        .await
    }

    async fn delete_enabled_model(&self, owner: &str, provider: &str, model: &str) -> Result<bool> {
        let owner = owner.to_owned();
        let provider = provider.to_owned();
        let model = model.to_owned();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM enabled_models WHERE owner = ?1 AND provider = ?2 AND model = ?3",
                params![&owner, &provider, &model],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_enabled_models(&self, owner: &str) -> Result<Vec<EnabledModel>> {
        let owner = owner.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner, provider, model, created_at
                 FROM enabled_models WHERE owner = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![&owner], row_to_enabled_model)?;
            rows.collect()
        })
        .await
    }

    async fn create_team_with_manager(&self, team: Team, manager: Agent) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO teams (id, owner, name, function, manager_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &team.id,
                    &team.owner,
                    &team.name,
                    &team.function,
                    &team.manager_id,
                    team.created_at.to_rfc3339(),
                ],
            )?;
            tx.execute(
                "INSERT INTO agents (id, team_id, name, role, model_id, is_manager, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &manager.id,
                    &manager.team_id,
                    &manager.name,
                    &manager.role,
                    &manager.model_id,
                    manager.is_manager as i64,
                    manager.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            debug!("created team {} with manager {}", team.id, team.manager_id);
            Ok(())
        })
        .await
    }

    async fn get_team(&self, owner: &str, team_id: &str) -> Result<Option<Team>> {
        let owner = owner.to_owned();
        let team_id = team_id.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, owner, name, function, manager_id, created_at
                 FROM teams WHERE id = ?1 AND owner = ?2",
                params![&team_id, &owner],
                row_to_team,
            )
            .optional()
        })
        .await
    }

    async fn list_teams(&self, owner: &str) -> Result<Vec<Team>> {
        let owner = owner.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner, name, function, manager_id, created_at
                 FROM teams WHERE owner = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![&owner], row_to_team)?;
            rows.collect()
        })
        .await
    }

    async fn insert_agent(&self, agent: Agent) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, team_id, name, role, model_id, is_manager, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &agent.id,
                    &agent.team_id,
                    &agent.name,
                    &agent.role,
                    &agent.model_id,
                    agent.is_manager as i64,
                    agent.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_agents(&self, team_id: &str) -> Result<Vec<Agent>> {
        let team_id = team_id.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, team_id, name, role, model_id, is_manager, created_at
                 FROM agents WHERE team_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![&team_id], row_to_agent)?;
            rows.collect()
        })
        .await
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        let agent_id = agent_id.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, team_id, name, role, model_id, is_manager, created_at
                 FROM agents WHERE id = ?1",
                params![&agent_id],
                row_to_agent,
            )
            .optional()
        })
        .await
    }

    async fn append_message(&self, msg: NewMessage) -> Result<Message> {
        self.with_conn(move |conn| {
            let id = Uuid::new_v4().to_string();
            let timestamp = Utc::now();
            conn.execute(
                "INSERT INTO messages (id, team_id, sender, sender_id, body, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &id,
                    &msg.team_id,
                    msg.sender.to_string(),
                    &msg.sender_id,
                    &msg.body,
                    timestamp.to_rfc3339(),
                ],
            )?;
            let seq = conn.last_insert_rowid();
            Ok(Message {
                id,
                seq,
                team_id: msg.team_id,
                sender: msg.sender,
                sender_id: msg.sender_id,
                body: msg.body,
                timestamp,
            })
        })
        .await
    }

    async fn list_messages(&self, team_id: &str) -> Result<Vec<Message>> {
        let team_id = team_id.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, id, team_id, sender, sender_id, body, timestamp
                 FROM messages WHERE team_id = ?1 ORDER BY timestamp, seq",
            )?;
            let rows = stmt.query_map(params![&team_id], row_to_message)?;
            rows.collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_initializes_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreman.db");
        let store = SqliteStore::new(&path).unwrap();

        let cred = Credential::new("alice", "openai", "sk-test", None);
        store.upsert_credential(cred).await.unwrap();
        assert!(store.get_credential("alice", "openai").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_credential_upsert_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = Credential::new("alice", "openai", "sk-old", None);
        store.upsert_credential(first).await.unwrap();
        let second = Credential::new("alice", "openai", "sk-new", Some("https://proxy".into()));
        store.upsert_credential(second).await.unwrap();

        let stored = store.get_credential("alice", "openai").await.unwrap().unwrap();
        assert_eq!(stored.secret, "sk-new");
        assert_eq!(stored.endpoint.as_deref(), Some("https://proxy"));
        assert_eq!(store.list_credentials("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let store = SqliteStore::open_in_memory().unwrap();
        let model = EnabledModel::new("alice", "openai", "gpt-4o");
        let model_id = model.id.clone();
        store.insert_enabled_model(model).await.unwrap();

        assert!(store.get_enabled_model_by_id("alice", &model_id).await.unwrap().is_some());
        // Another owner cannot resolve alice's model id.
        assert!(store.get_enabled_model_by_id("bob", &model_id).await.unwrap().is_none());
    }
}
