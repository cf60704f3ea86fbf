// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use solace_config::model::StorageConfig;
use solace_core::{Conversation, ConversationStore, Message, SolaceError, UserRecord};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`ConversationStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not
    /// initialized.
    fn db(&self) -> Result<&Database, SolaceError> {
        self.db.get().ok_or_else(|| SolaceError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn initialize(&self) -> Result<(), SolaceError> {
        let db = Database::open_with_options(&self.config.database_path, self.config.wal_mode)
            .await?;
        self.db.set(db).map_err(|_| SolaceError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SolaceError> {
        self.db()?.close().await
    }

    // --- User operations ---

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, SolaceError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), SolaceError> {
        queries::users::create_user(self.db()?, user).await
    }

    async fn set_user_active(&self, id: &str, active: bool) -> Result<(), SolaceError> {
        queries::users::set_user_active(self.db()?, id, active).await
    }

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), SolaceError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SolaceError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, SolaceError> {
        queries::conversations::list_conversations(self.db()?, user_id, limit, offset).await
    }

    async fn set_crisis_flag(&self, conversation_id: &str) -> Result<(), SolaceError> {
        queries::conversations::set_crisis_flag(self.db()?, conversation_id).await
    }

    async fn append_techniques(
        &self,
        conversation_id: &str,
        techniques: &[String],
    ) -> Result<(), SolaceError> {
        queries::conversations::append_techniques(self.db()?, conversation_id, techniques).await
    }

    async fn end_conversation(
        &self,
        conversation_id: &str,
        mood_end: Option<&str>,
        summary: &str,
    ) -> Result<(), SolaceError> {
        let ended_at = chrono::Utc::now().to_rfc3339();
        queries::conversations::end_conversation(
            self.db()?,
            conversation_id,
            mood_end,
            summary,
            &ended_at,
        )
        .await
    }

    // --- Message operations ---

    async fn append_message(&self, message: &Message) -> Result<(), SolaceError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, SolaceError> {
        queries::messages::list_messages(self.db()?, conversation_id).await
    }

    async fn list_recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<Message>, SolaceError> {
        queries::messages::list_recent_messages(self.db()?, conversation_id, limit).await
    }
}
