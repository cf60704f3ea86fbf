// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time conversation session engine.
//!
//! The [`Engine`] is the central coordinator that:
//! - Authenticates live connections and registers them in the session
//!   registry
//! - Routes room protocol events (join/leave/send/typing)
//! - Admits sends through per-identity rate limiting
//! - Runs each admitted message through the analysis/persist/reply pipeline
//!   on a per-conversation sequential queue
//! - Fans results back out to every subscriber of the conversation
//!
//! Concurrency model: messages for the same conversation are processed
//! strictly in admission order end-to-end by a dedicated worker task;
//! messages for different conversations proceed fully in parallel. A
//! global lock across conversations is deliberately absent.

pub mod admission;
pub mod events;
pub mod pipeline;
pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use solace_config::SolaceConfig;
use solace_core::{
    AnalysisPipeline, ConnectionId, Conversation, ConversationStore, ConversationStatus,
    CredentialVerifier, Identity, Message, MessageRole, ResponseGenerator, SolaceError,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::admission::AdmissionControl;
use crate::events::{ClientEvent, ServerEvent};
use crate::pipeline::{MessagePipeline, SendJob};
use crate::registry::SessionRegistry;

pub use crate::admission::RateLimiter;

/// The conversation session engine.
pub struct Engine {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ConversationStore>,
    verifier: Arc<dyn CredentialVerifier>,
    admission: AdmissionControl,
    pipeline: Arc<MessagePipeline>,
    queues: DashMap<String, mpsc::Sender<SendJob>>,
    config: SolaceConfig,
    cancel: CancellationToken,
}

impl Engine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        analysis: Arc<dyn AnalysisPipeline>,
        responder: Arc<dyn ResponseGenerator>,
        verifier: Arc<dyn CredentialVerifier>,
        config: SolaceConfig,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let admission = AdmissionControl::new(&config.limits);
        let pipeline = Arc::new(MessagePipeline::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            analysis,
            responder,
            config.engine.history_window,
            Duration::from_secs(config.engine.analysis_timeout_secs),
            Duration::from_secs(config.engine.generation_timeout_secs),
        ));
        info!(agent_name = config.agent.name.as_str(), "engine initialized");
        Self {
            registry,
            store,
            verifier,
            admission,
            pipeline,
            queues: DashMap::new(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// The session registry (presence queries and tests).
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The admission tiers (the gateway applies the API tier).
    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    /// The conversation store.
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Resolves a bearer credential to an identity via the configured
    /// verifier.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, SolaceError> {
        self.verifier.verify(token).await
    }

    /// Registers a new connection for a verified identity and returns its
    /// event stream.
    pub fn connect(&self, identity: Identity) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let connection_id = ConnectionId(uuid::Uuid::new_v4().to_string());
        let (tx, rx) = mpsc::channel(self.config.engine.queue_capacity);
        self.registry.register(&connection_id, identity.clone(), tx);
        info!(user_id = %identity.user_id, %connection_id, "connection registered");
        (connection_id, rx)
    }

    /// Unregisters a connection on transport close.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        let identity = self.registry.identity_of(connection_id);
        let went_offline = self.registry.unregister(connection_id);
        if let Some(identity) = identity {
            info!(
                user_id = %identity.user_id,
                %connection_id,
                offline = went_offline,
                "connection closed"
            );
        }
    }

    /// Routes one client event from a connection.
    pub async fn handle_event(&self, connection_id: &ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::JoinConversation { conversation_id } => {
                self.handle_join(connection_id, &conversation_id).await;
            }
            ClientEvent::LeaveConversation => {
                self.registry.leave_room(connection_id);
            }
            ClientEvent::SendMessage {
                conversation_id,
                content,
                content_type,
                audio_url,
            } => {
                self.handle_send(connection_id, conversation_id, content, content_type, audio_url)
                    .await;
            }
            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => {
                self.handle_typing(connection_id, &conversation_id, is_typing)
                    .await;
            }
        }
    }

    /// Sends a structured error event to a connection (also used by the
    /// gateway for unparseable frames).
    pub async fn send_error(&self, connection_id: &ConnectionId, err: &SolaceError) {
        self.registry
            .send_to_connection(connection_id, ServerEvent::error(err))
            .await;
    }

    async fn handle_join(&self, connection_id: &ConnectionId, conversation_id: &str) {
        let Some(identity) = self.registry.identity_of(connection_id) else {
            warn!(%connection_id, "event from unregistered connection");
            return;
        };

        // The registry's room map is a cache; ownership is re-validated
        // against the store on every join.
        let conversation = match self.store.get_conversation(conversation_id).await {
            Ok(conversation) => conversation,
            Err(err) => {
                error!(error = %err, conversation_id, "conversation lookup failed");
                self.send_error(connection_id, &err).await;
                return;
            }
        };

        match conversation {
            None => {
                self.send_error(connection_id, &SolaceError::NotFound("conversation".into()))
                    .await;
            }
            Some(conversation) if conversation.user_id != identity.user_id => {
                warn!(
                    target: "audit",
                    user_id = %identity.user_id,
                    conversation_id,
                    "join denied: not the owner"
                );
                self.send_error(
                    connection_id,
                    &SolaceError::AuthorizationDenied(
                        "conversation belongs to another user".into(),
                    ),
                )
                .await;
            }
            Some(_) => {
                self.registry.join_room(connection_id, conversation_id);
                self.registry
                    .send_to_connection(
                        connection_id,
                        ServerEvent::JoinedConversation {
                            conversation_id: conversation_id.to_string(),
                        },
                    )
                    .await;
                info!(
                    user_id = %identity.user_id,
                    conversation_id,
                    "user joined conversation"
                );
            }
        }
    }

    async fn handle_send(
        &self,
        connection_id: &ConnectionId,
        conversation_id: String,
        content: String,
        content_type: solace_core::ContentType,
        audio_url: Option<String>,
    ) {
        let Some(identity) = self.registry.identity_of(connection_id) else {
            warn!(%connection_id, "event from unregistered connection");
            return;
        };

        if content.trim().is_empty() {
            self.send_error(
                connection_id,
                &SolaceError::ValidationFailed("message content is empty".into()),
            )
            .await;
            return;
        }

        // Membership check: the admission point for the room invariant.
        if self.registry.room_of(connection_id).as_deref() != Some(conversation_id.as_str()) {
            self.send_error(
                connection_id,
                &SolaceError::AuthorizationDenied("not in conversation".into()),
            )
            .await;
            return;
        }

        // Message-tier rate limit; a denial never partially admits.
        if let Err(err) = self.admission.admit_message(&identity.user_id) {
            self.send_error(connection_id, &err).await;
            return;
        }

        let job = SendJob {
            connection_id: connection_id.clone(),
            identity,
            conversation_id,
            content,
            content_type,
            audio_url,
        };
        self.submit(job).await;
    }

    async fn handle_typing(
        &self,
        connection_id: &ConnectionId,
        conversation_id: &str,
        is_typing: bool,
    ) {
        let Some(identity) = self.registry.identity_of(connection_id) else {
            return;
        };
        if self.registry.room_of(connection_id).as_deref() != Some(conversation_id) {
            return;
        }
        self.registry
            .broadcast_except(
                conversation_id,
                connection_id,
                ServerEvent::UserTyping {
                    user_id: identity.user_id,
                    is_typing,
                },
            )
            .await;
    }

    /// Enqueues a job on its conversation's sequential worker. The channel
    /// is the admission order: FIFO per conversation, end-to-end.
    async fn submit(&self, mut job: SendJob) {
        for attempt in 0..2 {
            let tx = match self.queues.entry(job.conversation_id.clone()) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    let tx = self.spawn_worker(job.conversation_id.clone());
                    entry.insert(tx.clone());
                    tx
                }
            };

            match tx.send(job).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    // The worker exited (conversation ended or shutdown);
                    // drop the stale entry and retry once with a fresh
                    // worker, whose validation will give the real verdict.
                    job = returned;
                    self.queues.remove(&job.conversation_id);
                    if attempt == 1 {
                        warn!(
                            conversation_id = %job.conversation_id,
                            "dropping message for closed conversation queue"
                        );
                    }
                }
            }
        }
    }

    fn spawn_worker(&self, conversation_id: String) -> mpsc::Sender<SendJob> {
        let (tx, mut rx) = mpsc::channel::<SendJob>(self.config.engine.queue_capacity);
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            debug!(conversation_id, "conversation worker started");
            loop {
                tokio::select! {
                    job = rx.recv() => match job {
                        Some(job) => {
                            let outcome = pipeline.process(job).await;
                            debug!(conversation_id, ?outcome, "pipeline run finished");
                        }
                        None => break,
                    },
                    _ = cancel.cancelled() => break,
                }
            }
            debug!(conversation_id, "conversation worker stopped");
        });
        tx
    }

    // --- Conversation lifecycle ---

    /// Creates an active conversation owned by the identity and seeds the
    /// system greeting message.
    pub async fn start_conversation(
        &self,
        identity: &Identity,
        title: Option<String>,
        initial_mood: Option<String>,
    ) -> Result<Conversation, SolaceError> {
        let now = chrono::Utc::now().to_rfc3339();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            title: title.unwrap_or_else(|| "New Conversation".to_string()),
            status: ConversationStatus::Active,
            crisis: false,
            mood_start: initial_mood,
            mood_end: None,
            techniques: Vec::new(),
            summary: None,
            started_at: now.clone(),
            ended_at: None,
        };
        self.store.create_conversation(&conversation).await?;

        let greeting = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            role: MessageRole::System,
            content: self.config.agent.greeting.clone(),
            content_type: solace_core::ContentType::Text,
            audio_url: None,
            sentiment: None,
            crisis: None,
            reply_meta: None,
            created_at: now,
        };
        self.store.append_message(&greeting).await?;

        info!(
            conversation_id = %conversation.id,
            user_id = %identity.user_id,
            "conversation started"
        );
        Ok(conversation)
    }

    /// Ends a conversation: ownership-checked transition to `completed`
    /// with a generated summary. Subsequent sends are rejected by pipeline
    /// validation.
    pub async fn end_conversation(
        &self,
        identity: &Identity,
        conversation_id: &str,
        mood_end: Option<&str>,
    ) -> Result<Conversation, SolaceError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| SolaceError::NotFound("conversation".into()))?;
        if conversation.user_id != identity.user_id {
            return Err(SolaceError::AuthorizationDenied(
                "conversation belongs to another user".into(),
            ));
        }

        let messages = self.store.list_messages(conversation_id).await?;
        let summary = summarize(&messages);
        self.store
            .end_conversation(conversation_id, mood_end, &summary)
            .await?;

        // Retire the worker; it drains in-flight jobs, whose validation now
        // rejects against the completed status.
        self.queues.remove(conversation_id);

        info!(conversation_id, user_id = %identity.user_id, "conversation ended");
        self.store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| SolaceError::NotFound("conversation".into()))
    }

    /// Lists the identity's conversations, most recent first.
    pub async fn conversations(
        &self,
        identity: &Identity,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, SolaceError> {
        self.store
            .list_conversations(&identity.user_id, limit, offset)
            .await
    }

    /// A conversation plus its messages in replay order, ownership-checked.
    pub async fn conversation_detail(
        &self,
        identity: &Identity,
        conversation_id: &str,
    ) -> Result<(Conversation, Vec<Message>), SolaceError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| SolaceError::NotFound("conversation".into()))?;
        if conversation.user_id != identity.user_id {
            return Err(SolaceError::AuthorizationDenied(
                "conversation belongs to another user".into(),
            ));
        }
        let messages = self.store.list_messages(conversation_id).await?;
        Ok((conversation, messages))
    }

    /// Stops all conversation workers. The store is closed by the caller
    /// that opened it.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.queues.clear();
        info!("engine shut down");
    }
}

/// Word-count summary recorded when a conversation ends.
fn summarize(messages: &[Message]) -> String {
    let total = messages.len();
    let words: usize = messages
        .iter()
        .map(|m| m.content.split_whitespace().count())
        .sum();
    format!("Conversation with {total} messages and approximately {words} words.")
}
