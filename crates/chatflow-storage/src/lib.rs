//! Chatflow Storage - persistence layer for conversations and messages.
//!
//! Uses redb as the embedded database with one table per entity type.
//! Records are serialized as JSON bytes; message keys embed the conversation
//! id and creation timestamp so a prefix range scan yields chronological
//! order without a secondary index.

pub mod conversation;
pub mod message;

mod range_utils;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use conversation::{Conversation, ConversationStore, DEFAULT_TITLE};
pub use message::{Message, MessageRole, MessageStore};

/// Central storage manager that initializes all stores against one database.
pub struct Storage {
    pub conversations: ConversationStore,
    pub messages: MessageStore,
}

impl Storage {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_database(Arc::new(Database::create(db_path)?))
    }

    pub fn with_database(db: Arc<Database>) -> Result<Self> {
        let conversations = ConversationStore::new(db.clone())?;
        let messages = MessageStore::new(db)?;

        Ok(Self {
            conversations,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_storage_opens_all_tables() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(temp_dir.path().join("test.db")).unwrap();

        let conversation = Conversation::new(None);
        storage.conversations.create(&conversation).unwrap();

        let message = Message::new(&conversation.id, MessageRole::User, "hello");
        storage.messages.upsert(&message).unwrap();

        assert!(
            storage
                .conversations
                .get(&conversation.id)
                .unwrap()
                .is_some()
        );
        assert_eq!(storage.messages.count(&conversation.id).unwrap(), 1);
    }
}
