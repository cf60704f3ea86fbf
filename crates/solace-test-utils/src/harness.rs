// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine harness: temp SQLite store + mock collaborators + engine, with
//! helpers to connect users, join rooms, and collect server events.
//!
//! Each harness is fully isolated; tests are independent and
//! order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use solace_config::SolaceConfig;
use solace_core::{
    ConnectionId, Conversation, ConversationStore, Identity, Message, SolaceError, UserRecord,
};
use solace_engine::Engine;
use solace_engine::events::{ClientEvent, ServerEvent};
use solace_storage::SqliteStore;

use crate::mock_analysis::MockAnalysis;
use crate::mock_responder::MockResponder;
use crate::mock_verifier::StaticVerifier;

/// How long event helpers wait before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// One connected test client.
pub struct TestConnection {
    pub id: ConnectionId,
    rx: mpsc::Receiver<ServerEvent>,
}

impl TestConnection {
    /// Next event, or None after the receive timeout / closed channel.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.rx.try_recv().ok()
    }

    /// Next `new-message` event, skipping typing indicators.
    pub async fn recv_new_message(&mut self) -> Option<Message> {
        loop {
            match self.recv().await? {
                ServerEvent::NewMessage { message } => return Some(message),
                ServerEvent::AiTyping { .. } | ServerEvent::UserTyping { .. } => continue,
                other => panic!("expected new-message, got {other:?}"),
            }
        }
    }

    /// Next `error` event, skipping typing indicators and message events.
    pub async fn recv_error(&mut self) -> Option<(String, Option<u64>)> {
        loop {
            match self.recv().await? {
                ServerEvent::Error {
                    code,
                    retry_after_secs,
                    ..
                } => return Some((code, retry_after_secs)),
                _ => continue,
            }
        }
    }
}

/// Builder for [`EngineHarness`].
pub struct EngineHarnessBuilder {
    replies: Vec<String>,
    echoing: bool,
    config: SolaceConfig,
}

impl EngineHarnessBuilder {
    /// Queue scripted replies for the mock responder.
    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Put the responder in echo mode ("re: <last user message>").
    pub fn echoing(mut self) -> Self {
        self.echoing = true;
        self
    }

    /// Override the message-tier limiter.
    pub fn message_limit(mut self, max: u32, window_secs: u64) -> Self {
        self.config.limits.message_max = max;
        self.config.limits.message_window_secs = window_secs;
        self
    }

    /// Override the reply-context window.
    pub fn history_window(mut self, window: i64) -> Self {
        self.config.engine.history_window = window;
        self
    }

    pub async fn build(self) -> Result<EngineHarness, SolaceError> {
        let temp_dir = tempfile::tempdir().map_err(|e| SolaceError::Storage {
            source: Box::new(e),
        })?;
        let mut config = self.config;
        config.storage.database_path = temp_dir
            .path()
            .join("harness.db")
            .to_string_lossy()
            .into_owned();
        // Short call timeouts keep failure-path tests fast.
        config.engine.analysis_timeout_secs = 5;
        config.engine.generation_timeout_secs = 5;

        let store = Arc::new(SqliteStore::new(config.storage.clone()));
        store.initialize().await?;

        let analysis = Arc::new(MockAnalysis::new());
        let responder = if self.echoing {
            Arc::new(MockResponder::echoing())
        } else {
            Arc::new(MockResponder::with_replies(self.replies))
        };
        let verifier = Arc::new(StaticVerifier::new());

        let engine = Arc::new(Engine::new(
            store.clone() as Arc<dyn ConversationStore>,
            analysis.clone(),
            responder.clone(),
            verifier.clone(),
            config,
        ));

        Ok(EngineHarness {
            engine,
            store,
            analysis,
            responder,
            verifier,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired engine over a temp database and mock collaborators.
pub struct EngineHarness {
    pub engine: Arc<Engine>,
    pub store: Arc<SqliteStore>,
    pub analysis: Arc<MockAnalysis>,
    pub responder: Arc<MockResponder>,
    pub verifier: Arc<StaticVerifier>,
    _temp_dir: TempDir,
}

impl EngineHarness {
    pub fn builder() -> EngineHarnessBuilder {
        EngineHarnessBuilder {
            replies: Vec::new(),
            echoing: false,
            config: SolaceConfig::default(),
        }
    }

    /// Seed an active user row and return its identity.
    pub async fn create_user(&self, user_id: &str) -> Result<Identity, SolaceError> {
        self.store
            .create_user(&UserRecord {
                id: user_id.to_string(),
                email: None,
                role: "user".to_string(),
                active: true,
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .await?;
        Ok(Identity {
            user_id: user_id.to_string(),
            role: "user".to_string(),
            active: true,
        })
    }

    /// Open a connection for an identity (handshake already verified).
    pub fn connect(&self, identity: &Identity) -> TestConnection {
        let (id, rx) = self.engine.connect(identity.clone());
        TestConnection { id, rx }
    }

    /// Start a conversation owned by the identity.
    pub async fn start_conversation(
        &self,
        identity: &Identity,
    ) -> Result<Conversation, SolaceError> {
        self.engine.start_conversation(identity, None, None).await
    }

    /// Join a connection to a conversation room.
    pub async fn join(&self, connection: &TestConnection, conversation_id: &str) {
        self.engine
            .handle_event(
                &connection.id,
                ClientEvent::JoinConversation {
                    conversation_id: conversation_id.to_string(),
                },
            )
            .await;
    }

    /// Send a text message from a connection.
    pub async fn send_text(
        &self,
        connection: &TestConnection,
        conversation_id: &str,
        content: &str,
    ) {
        self.engine
            .handle_event(
                &connection.id,
                ClientEvent::SendMessage {
                    conversation_id: conversation_id.to_string(),
                    content: content.to_string(),
                    content_type: solace_core::ContentType::Text,
                    audio_url: None,
                },
            )
            .await;
    }
}
