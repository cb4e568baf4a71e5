//! Append-only, time-ordered conversation log per team

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Message, NewMessage, SenderKind};

/// The transcript facade. Messages are immutable once appended; the store
/// assigns each a timestamp and a strictly monotonic sequence number, and
/// `list` returns them in (timestamp, seq) order.
pub struct Transcript {
    store: Arc<dyn Store>,
}

impl Transcript {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn append(
        &self,
        team_id: &str,
        sender: SenderKind,
        sender_id: &str,
        body: &str,
    ) -> Result<Message> {
        let msg = self
            .store
            .append_message(NewMessage {
                team_id: team_id.to_string(),
                sender,
                sender_id: sender_id.to_string(),
                body: body.to_string(),
            })
            .await?;
        debug!("appended {} message seq={} to team {team_id}", msg.sender, msg.seq);
        Ok(msg)
    }

    /// Full history of a team, ownership enforced.
    pub async fn list(&self, owner: &str, team_id: &str) -> Result<Vec<Message>> {
        let team = self
            .store
            .get_team(owner, team_id)
            .await?
            .ok_or(Error::TeamNotFound)?;
        self.store.list_messages(&team.id).await
    }
}
