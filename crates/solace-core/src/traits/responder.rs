// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response Generator trait: produces the next agent utterance.

use async_trait::async_trait;

use crate::error::SolaceError;
use crate::types::{AgentReply, HistoryMessage, MoodContext};

/// Generates the agent's next reply from a bounded history window and
/// conversation-level mood/technique context.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate_reply(
        &self,
        history: &[HistoryMessage],
        mood: &MoodContext,
    ) -> Result<AgentReply, SolaceError>;
}
