// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock response generator for deterministic testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use solace_core::{
    AgentReply, HistoryMessage, MessageRole, MoodContext, ResponseGenerator, SolaceError,
};

/// A mock response generator.
///
/// Replies are popped from a FIFO queue; with an empty queue it returns
/// "mock reply", or, in echo mode, "re: <last user message>" so concurrent
/// tests can pair each reply with the message that produced it.
#[derive(Default)]
pub struct MockResponder {
    replies: Mutex<VecDeque<String>>,
    echo: AtomicBool,
    fail: AtomicBool,
    delay: Mutex<Option<std::time::Duration>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            ..Self::default()
        }
    }

    /// Echo mode: each reply quotes the last user message in the history.
    pub fn echoing() -> Self {
        let responder = Self::default();
        responder.echo.store(true, Ordering::SeqCst);
        responder
    }

    /// Force every generation call to fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Add a reply to the end of the queue.
    pub async fn add_reply(&self, text: String) {
        self.replies.lock().await.push_back(text);
    }

    /// Delay every generation call (for mid-pipeline disconnect tests).
    pub async fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().await = Some(delay);
    }
}

#[async_trait]
impl ResponseGenerator for MockResponder {
    async fn generate_reply(
        &self,
        history: &[HistoryMessage],
        _mood: &MoodContext,
    ) -> Result<AgentReply, SolaceError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(SolaceError::Provider {
                message: "mock generation failure".into(),
                source: None,
            });
        }

        let text = if self.echo.load(Ordering::SeqCst) {
            let last_user = history
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            format!("re: {last_user}")
        } else {
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| "mock reply".to_string())
        };

        Ok(AgentReply {
            text,
            techniques: vec!["active-listening".to_string()],
            tone: "supportive".to_string(),
            follow_ups: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(content: &str) -> Vec<HistoryMessage> {
        vec![HistoryMessage {
            role: MessageRole::User,
            content: content.to_string(),
        }]
    }

    #[tokio::test]
    async fn queued_replies_returned_in_order() {
        let responder = MockResponder::with_replies(vec!["first".into(), "second".into()]);
        let mood = MoodContext::default();
        assert_eq!(
            responder.generate_reply(&history("a"), &mood).await.unwrap().text,
            "first"
        );
        assert_eq!(
            responder.generate_reply(&history("b"), &mood).await.unwrap().text,
            "second"
        );
        assert_eq!(
            responder.generate_reply(&history("c"), &mood).await.unwrap().text,
            "mock reply"
        );
    }

    #[tokio::test]
    async fn echo_mode_quotes_the_last_user_message() {
        let responder = MockResponder::echoing();
        let reply = responder
            .generate_reply(&history("rough day"), &MoodContext::default())
            .await
            .unwrap();
        assert_eq!(reply.text, "re: rough day");
    }

    #[tokio::test]
    async fn failure_switch_forces_errors() {
        let responder = MockResponder::new();
        responder.fail(true);
        assert!(
            responder
                .generate_reply(&history("x"), &MoodContext::default())
                .await
                .is_err()
        );
    }
}
