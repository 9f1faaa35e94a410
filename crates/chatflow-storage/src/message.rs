//! Message storage.
//!
//! Keys are `{conversation_id}:{created_at:020}:{message_id}` so a prefix
//! range scan returns one conversation's messages in creation order.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::range_utils::prefix_end_bound;

const MESSAGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");

/// Role of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A persisted chat message belonging to exactly one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

impl Message {
    pub fn new(
        conversation_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn key(&self) -> String {
        // Zero-padded millis keep lexicographic order equal to chronological
        // order within a conversation.
        format!(
            "{}:{:020}:{}",
            self.conversation_id, self.created_at, self.id
        )
    }
}

/// Message storage over a shared redb database.
#[derive(Debug, Clone)]
pub struct MessageStore {
    db: Arc<Database>,
}

impl MessageStore {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(MESSAGES_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or overwrite a message. Creation and the incremental/final
    /// content updates of an assistant message are the same write because the
    /// key is derived from immutable fields.
    pub fn upsert(&self, message: &Message) -> Result<()> {
        let data = serde_json::to_vec(message)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MESSAGES_TABLE)?;
            table.insert(message.key().as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All messages of a conversation, oldest first.
    pub fn list(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let prefix = format!("{}:", conversation_id);
        let end = prefix_end_bound(&prefix);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGES_TABLE)?;

        let mut messages = Vec::new();
        for item in table.range(prefix.as_str()..end.as_str())? {
            let (_, value) = item?;
            messages.push(serde_json::from_slice(value.value())?);
        }

        Ok(messages)
    }

    /// The most recent `n` messages of a conversation, still oldest first.
    pub fn last_n(&self, conversation_id: &str, n: usize) -> Result<Vec<Message>> {
        let mut messages = self.list(conversation_id)?;
        let len = messages.len();
        if len > n {
            messages.drain(..len - n);
        }
        Ok(messages)
    }

    pub fn count(&self, conversation_id: &str) -> Result<usize> {
        Ok(self.list(conversation_id)?.len())
    }
}
