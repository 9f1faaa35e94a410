//! Conversation storage.

use anyhow::{Result, anyhow};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CONVERSATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("conversations");

/// Title given to a conversation before the first generated one replaces it.
pub const DEFAULT_TITLE: &str = "New conversation";

/// A persisted conversation. The streaming pipeline only ever mutates the
/// title and the activity timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: i64,
    pub last_activity: i64,
}

impl Conversation {
    pub fn new(model: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            model,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

/// Conversation storage over a shared redb database.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    db: Arc<Database>,
}

impl ConversationStore {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CONVERSATIONS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn create(&self, conversation: &Conversation) -> Result<()> {
        let data = serde_json::to_vec(conversation)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONVERSATIONS_TABLE)?;
            table.insert(conversation.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONVERSATIONS_TABLE)?;

        match table.get(id)? {
            Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Replace the title and bump the activity timestamp in one write.
    pub fn set_title(&self, id: &str, title: &str) -> Result<Conversation> {
        self.update(id, |conversation| {
            conversation.title = title.to_string();
            conversation.last_activity = chrono::Utc::now().timestamp_millis();
        })
    }

    /// Bump the activity timestamp.
    pub fn touch(&self, id: &str) -> Result<Conversation> {
        self.update(id, |conversation| {
            conversation.last_activity = chrono::Utc::now().timestamp_millis();
        })
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut Conversation)) -> Result<Conversation> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(CONVERSATIONS_TABLE)?;
            let mut conversation: Conversation = match table.get(id)? {
                Some(data) => serde_json::from_slice(data.value())?,
                None => return Err(anyhow!("conversation '{}' not found", id)),
            };
            apply(&mut conversation);
            let data = serde_json::to_vec(&conversation)?;
            table.insert(id, data.as_slice())?;
            conversation
        };
        write_txn.commit()?;
        Ok(updated)
    }
}
