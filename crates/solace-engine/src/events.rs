// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room protocol events.
//!
//! JSON over the connection, tagged by `type` with kebab-case event names
//! and camelCase payload fields.
//!
//! Client -> Server:
//! ```json
//! {"type": "join-conversation", "conversationId": "..."}
//! {"type": "leave-conversation"}
//! {"type": "send-message", "conversationId": "...", "content": "...",
//!  "contentType": "text", "audioUrl": null}
//! {"type": "typing", "conversationId": "...", "isTyping": true}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"type": "joined-conversation", "conversationId": "..."}
//! {"type": "new-message", "message": {...}}
//! {"type": "ai-typing", "isTyping": true}
//! {"type": "user-typing", "userId": "...", "isTyping": true}
//! {"type": "error", "code": "rate-limited", "message": "...", "retryAfterSecs": 12}
//! ```

use serde::{Deserialize, Serialize};
use solace_core::{ContentType, Message, SolaceError};

/// An event received from a client connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinConversation {
        conversation_id: String,
    },
    LeaveConversation,
    SendMessage {
        conversation_id: String,
        content: String,
        #[serde(default = "default_content_type")]
        content_type: ContentType,
        #[serde(default)]
        audio_url: Option<String>,
    },
    Typing {
        conversation_id: String,
        is_typing: bool,
    },
}

fn default_content_type() -> ContentType {
    ContentType::Text
}

/// An event delivered to client connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    JoinedConversation {
        conversation_id: String,
    },
    NewMessage {
        message: Message,
    },
    AiTyping {
        is_typing: bool,
    },
    UserTyping {
        user_id: String,
        is_typing: bool,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
    },
}

impl ServerEvent {
    /// Builds the structured error event for a failure, carrying the
    /// retry-after hint when the failure is a rate limit denial.
    pub fn error(err: &SolaceError) -> Self {
        let retry_after_secs = match err {
            SolaceError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            retry_after_secs,
        }
    }
}
