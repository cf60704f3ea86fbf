// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation Store trait: the durable record of users, conversations,
//! and messages.
//!
//! The store is the single source of truth for conversation status and the
//! crisis flag; the engine's in-memory room membership is a cache that is
//! re-validated against the store on every join.

use async_trait::async_trait;

use crate::error::SolaceError;
use crate::types::{Conversation, Message, UserRecord};

/// Durable persistence backend for conversations and messages.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Initializes the backend (migrations, connection setup).
    async fn initialize(&self) -> Result<(), SolaceError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), SolaceError>;

    // --- User operations ---

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, SolaceError>;

    async fn create_user(&self, user: &UserRecord) -> Result<(), SolaceError>;

    async fn set_user_active(&self, id: &str, active: bool) -> Result<(), SolaceError>;

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), SolaceError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SolaceError>;

    /// Lists a user's conversations, most recently started first.
    async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, SolaceError>;

    /// Sets the conversation's crisis flag. Monotonic: there is no
    /// operation to clear it.
    async fn set_crisis_flag(&self, conversation_id: &str) -> Result<(), SolaceError>;

    /// Appends technique tags to the conversation's accumulated set.
    async fn append_techniques(
        &self,
        conversation_id: &str,
        techniques: &[String],
    ) -> Result<(), SolaceError>;

    /// Transitions the conversation to `completed` with an end timestamp,
    /// optional closing mood, and summary text.
    async fn end_conversation(
        &self,
        conversation_id: &str,
        mood_end: Option<&str>,
        summary: &str,
    ) -> Result<(), SolaceError>;

    // --- Message operations ---

    async fn append_message(&self, message: &Message) -> Result<(), SolaceError>;

    /// All messages of a conversation in creation order (the replay order
    /// for late joiners).
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, SolaceError>;

    /// The most recent `limit` messages of a conversation, returned in
    /// chronological order (the reply-context window).
    async fn list_recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<Message>, SolaceError>;
}
