// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message pipeline: the ordered sequence of steps one admitted user
//! message goes through.
//!
//! `Admitted -> Validated -> Analyzed -> Persisted -> {CrisisFlagged|Clear}
//!  -> ReplyRequested -> ReplyPersisted -> Broadcast -> Done`, with terminal
//! `Rejected` (nothing persisted) and `Failed` (user message persisted, no
//! reply, sender notified).
//!
//! One pipeline instance is shared by all per-conversation workers; each
//! worker processes its conversation's jobs strictly in admission order, so
//! broadcast order equals admission order without a global lock.

use std::sync::Arc;
use std::time::Duration;

use solace_core::{
    AnalysisPipeline, ContentType, ConnectionId, ConversationStatus, CrisisAssessment,
    Conversation, ConversationStore, HistoryMessage, Identity, Message, MessageRole, MoodContext,
    ReplyMetadata, ResponseGenerator, SentimentResult, SolaceError,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::events::ServerEvent;
use crate::registry::SessionRegistry;

/// One admitted send, queued on its conversation's worker.
pub(crate) struct SendJob {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub conversation_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub audio_url: Option<String>,
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineOutcome {
    /// User message and reply persisted and broadcast.
    Done,
    /// Validation failed; nothing was persisted.
    Rejected,
    /// The user message is persisted but no reply was produced; the sender
    /// has been notified.
    Failed,
}

pub(crate) struct MessagePipeline {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ConversationStore>,
    analysis: Arc<dyn AnalysisPipeline>,
    responder: Arc<dyn ResponseGenerator>,
    history_window: i64,
    analysis_timeout: Duration,
    generation_timeout: Duration,
}

impl MessagePipeline {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn ConversationStore>,
        analysis: Arc<dyn AnalysisPipeline>,
        responder: Arc<dyn ResponseGenerator>,
        history_window: i64,
        analysis_timeout: Duration,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            analysis,
            responder,
            history_window,
            analysis_timeout,
            generation_timeout,
        }
    }

    /// Runs one message through the pipeline end-to-end.
    ///
    /// Failure routing: the sender always receives a distinct error event
    /// for a failed message; other room members receive nothing for it.
    pub async fn process(&self, job: SendJob) -> PipelineOutcome {
        // --- Validate ---
        let conversation = match self.validate(&job).await {
            Ok(conversation) => conversation,
            Err(err) => {
                self.notify_sender(&job, &err).await;
                if let SolaceError::AuthenticationFailed = err {
                    // The identity went inactive mid-session: tear it down.
                    self.registry.disconnect_identity(&job.identity.user_id);
                }
                return PipelineOutcome::Rejected;
            }
        };

        // --- Analyze (best-effort, concurrent, individually bounded) ---
        let (sentiment, crisis) = self.analyze(&job).await;

        // --- Persist user message ---
        let user_message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: job.conversation_id.clone(),
            role: MessageRole::User,
            content: job.content.clone(),
            content_type: job.content_type,
            audio_url: job.audio_url.clone(),
            sentiment,
            crisis: crisis.clone(),
            reply_meta: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(err) = self.store.append_message(&user_message).await {
            self.notify_sender(&job, &err).await;
            return PipelineOutcome::Failed;
        }

        // --- Crisis escalation, before any reply is attempted ---
        // A positive detection must reach persistence; a later generation
        // failure cannot suppress a committed flag.
        if crisis.as_ref().is_some_and(|c| c.is_crisis) {
            if let Err(err) = self.store.set_crisis_flag(&job.conversation_id).await {
                self.notify_sender(&job, &err).await;
                return PipelineOutcome::Failed;
            }
            if let Some(c) = &crisis {
                warn!(
                    target: "audit",
                    conversation_id = %job.conversation_id,
                    user_id = %job.identity.user_id,
                    risk_level = %c.risk_level,
                    "conversation flagged for crisis"
                );
            }
        }

        // --- Broadcast the user message ---
        self.registry
            .broadcast(
                &job.conversation_id,
                ServerEvent::NewMessage {
                    message: user_message,
                },
            )
            .await;

        // --- Generate reply (typing indicator wraps the generation step) ---
        self.registry
            .broadcast(&job.conversation_id, ServerEvent::AiTyping { is_typing: true })
            .await;

        let reply = self.generate(&job, &conversation).await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                self.registry
                    .broadcast(
                        &job.conversation_id,
                        ServerEvent::AiTyping { is_typing: false },
                    )
                    .await;
                // Reply-generation failure goes to the original sender
                // only; the room never sees a reply that does not exist.
                self.notify_sender(&job, &err).await;
                return PipelineOutcome::Failed;
            }
        };

        // --- Persist reply ---
        let reply_message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: job.conversation_id.clone(),
            role: MessageRole::Assistant,
            content: reply.text,
            content_type: ContentType::Text,
            audio_url: None,
            sentiment: None,
            crisis: None,
            reply_meta: Some(ReplyMetadata {
                techniques: reply.techniques.clone(),
                tone: reply.tone,
                follow_ups: reply.follow_ups,
            }),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(err) = self.store.append_message(&reply_message).await {
            self.registry
                .broadcast(
                    &job.conversation_id,
                    ServerEvent::AiTyping { is_typing: false },
                )
                .await;
            self.notify_sender(&job, &err).await;
            return PipelineOutcome::Failed;
        }

        // Technique accumulation is an annotation; losing it ranks below
        // losing the reply, so a failure here degrades instead of failing
        // the message.
        if !reply.techniques.is_empty()
            && let Err(err) = self
                .store
                .append_techniques(&job.conversation_id, &reply.techniques)
                .await
        {
            warn!(
                conversation_id = %job.conversation_id,
                error = %err,
                "technique accumulation degraded"
            );
        }

        // --- Broadcast the reply ---
        self.registry
            .broadcast(
                &job.conversation_id,
                ServerEvent::AiTyping { is_typing: false },
            )
            .await;
        self.registry
            .broadcast(
                &job.conversation_id,
                ServerEvent::NewMessage {
                    message: reply_message,
                },
            )
            .await;

        info!(
            conversation_id = %job.conversation_id,
            user_id = %job.identity.user_id,
            "message pipeline complete"
        );
        PipelineOutcome::Done
    }

    /// The conversation must exist, belong to the sender, and be active;
    /// the sender's account must still be active. Room membership was
    /// checked at admission; it is deliberately not re-checked here so a
    /// mid-pipeline disconnect cannot lose an admitted message.
    async fn validate(&self, job: &SendJob) -> Result<Conversation, SolaceError> {
        let user = self.store.get_user(&job.identity.user_id).await?;
        match user {
            Some(user) if user.active => {}
            _ => {
                warn!(
                    target: "audit",
                    user_id = %job.identity.user_id,
                    reason = "account inactive",
                    "send rejected, tearing session down"
                );
                return Err(SolaceError::AuthenticationFailed);
            }
        }

        let conversation = self
            .store
            .get_conversation(&job.conversation_id)
            .await?
            .ok_or_else(|| SolaceError::NotFound("conversation".into()))?;
        if conversation.user_id != job.identity.user_id {
            return Err(SolaceError::AuthorizationDenied(
                "conversation belongs to another user".into(),
            ));
        }
        if conversation.status != ConversationStatus::Active {
            return Err(SolaceError::AuthorizationDenied(
                "conversation is not active".into(),
            ));
        }
        Ok(conversation)
    }

    /// Runs sentiment and crisis detection concurrently, each under its own
    /// timeout. Failures degrade to absent data; they never block the
    /// message. Sentiment is skipped for non-text content.
    async fn analyze(&self, job: &SendJob) -> (Option<SentimentResult>, Option<CrisisAssessment>) {
        let sentiment_task = async {
            if job.content_type != ContentType::Text {
                return None;
            }
            match timeout(
                self.analysis_timeout,
                self.analysis.analyze_sentiment(&job.content),
            )
            .await
            {
                Ok(Ok(result)) => Some(result),
                Ok(Err(err)) => {
                    warn!(error = %err, "sentiment analysis degraded");
                    None
                }
                Err(_) => {
                    warn!(timeout = ?self.analysis_timeout, "sentiment analysis timed out");
                    None
                }
            }
        };

        let crisis_task = async {
            match timeout(
                self.analysis_timeout,
                self.analysis.detect_crisis(&job.content),
            )
            .await
            {
                Ok(Ok(assessment)) => Some(assessment),
                Ok(Err(err)) => {
                    warn!(error = %err, "crisis detection degraded");
                    None
                }
                Err(_) => {
                    warn!(timeout = ?self.analysis_timeout, "crisis detection timed out");
                    None
                }
            }
        };

        tokio::join!(sentiment_task, crisis_task)
    }

    /// Builds the bounded context window and requests the next agent
    /// utterance. Any failure, including timeout, maps to GenerationFailed.
    async fn generate(
        &self,
        job: &SendJob,
        conversation: &Conversation,
    ) -> Result<solace_core::AgentReply, SolaceError> {
        let recent = self
            .store
            .list_recent_messages(&job.conversation_id, self.history_window)
            .await?;
        let history: Vec<HistoryMessage> = recent
            .iter()
            .map(|m| HistoryMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        let mood = MoodContext {
            user_mood: conversation.mood_start.clone(),
            techniques: conversation.techniques.clone(),
        };

        debug!(
            conversation_id = %job.conversation_id,
            window = history.len(),
            "requesting reply"
        );

        match timeout(
            self.generation_timeout,
            self.responder.generate_reply(&history, &mood),
        )
        .await
        {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => Err(SolaceError::GenerationFailed {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }),
            Err(_) => Err(SolaceError::GenerationFailed {
                message: format!(
                    "reply generation timed out after {:?}",
                    self.generation_timeout
                ),
                source: None,
            }),
        }
    }

    /// Routes a failure to the original sender as a structured error event.
    /// If the sender already disconnected, the event is simply dropped.
    async fn notify_sender(&self, job: &SendJob, err: &SolaceError) {
        warn!(
            conversation_id = %job.conversation_id,
            user_id = %job.identity.user_id,
            error = %err,
            "message pipeline failure"
        );
        self.registry
            .send_to_connection(&job.connection_id, ServerEvent::error(err))
            .await;
    }
}
