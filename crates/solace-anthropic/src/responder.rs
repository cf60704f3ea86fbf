// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Therapeutic reply generation over the Messages API.
//!
//! The system prompt carries conversation-level mood and technique context;
//! a forced `therapeutic_response` tool returns the reply text plus
//! technique/tone/follow-up metadata.

use async_trait::async_trait;
use serde::Deserialize;
use solace_core::{
    AgentReply, HistoryMessage, MessageRole, MoodContext, ResponseGenerator, SolaceError,
};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest, ToolChoice, ToolDefinition};

const RESPONSE_TOOL: &str = "therapeutic_response";

/// Anthropic-backed implementation of the response generator.
pub struct AnthropicResponder {
    client: AnthropicClient,
    max_tokens: u32,
}

impl AnthropicResponder {
    pub fn new(client: AnthropicClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    fn response_tool() -> ToolDefinition {
        ToolDefinition {
            name: RESPONSE_TOOL.to_string(),
            description: "Generate a therapeutic response with techniques and follow-up questions"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "response": {
                        "type": "string",
                        "description": "The main therapeutic response to the user"
                    },
                    "techniques": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Therapeutic techniques being applied"
                    },
                    "emotional_tone": {
                        "type": "string",
                        "description": "The emotional tone of the response (supportive, encouraging, calming, etc.)"
                    },
                    "follow_up_questions": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Follow-up questions to deepen the conversation"
                    }
                },
                "required": ["response", "techniques", "emotional_tone", "follow_up_questions"]
            }),
        }
    }

    fn build_system_prompt(mood: &MoodContext) -> String {
        let techniques = if mood.techniques.is_empty() {
            "CBT, active listening, empathy".to_string()
        } else {
            mood.techniques.join(", ")
        };
        let user_mood = mood.user_mood.as_deref().unwrap_or("unknown");

        format!(
            "You are a compassionate and professional AI therapeutic assistant. Your role is \
             to provide supportive, empathetic responses while maintaining appropriate \
             boundaries.\n\
             \n\
             Guidelines:\n\
             1. Use therapeutic techniques including: {techniques}\n\
             2. Be empathetic and non-judgmental\n\
             3. Ask open-ended questions to encourage self-reflection\n\
             4. Validate feelings while encouraging healthy coping strategies\n\
             5. Never provide medical diagnoses or medication advice\n\
             6. If you detect crisis indicators, express concern and suggest professional help\n\
             7. Maintain a warm, professional tone\n\
             8. Focus on the user's strengths and resilience\n\
             9. Current user mood: {user_mood}\n\
             \n\
             Remember: You are not a replacement for professional therapy. Encourage users \
             to seek professional help when appropriate."
        )
    }
}

#[derive(Debug, Deserialize)]
struct ResponseToolOutput {
    response: String,
    #[serde(default)]
    techniques: Vec<String>,
    #[serde(default)]
    emotional_tone: String,
    #[serde(default)]
    follow_up_questions: Vec<String>,
}

#[async_trait]
impl ResponseGenerator for AnthropicResponder {
    async fn generate_reply(
        &self,
        history: &[HistoryMessage],
        mood: &MoodContext,
    ) -> Result<AgentReply, SolaceError> {
        // The persona lives in the system prompt; seeded system messages in
        // the history are dropped (the API accepts user/assistant turns only).
        let messages: Vec<ApiMessage> = history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        if messages.is_empty() {
            return Err(SolaceError::Provider {
                message: "cannot generate a reply from an empty history".to_string(),
                source: None,
            });
        }

        let request = MessageRequest {
            model: self.client.model().to_string(),
            messages,
            system: Some(Self::build_system_prompt(mood)),
            max_tokens: self.max_tokens,
            temperature: Some(0.7),
            tools: Some(vec![Self::response_tool()]),
            tool_choice: Some(ToolChoice::tool(RESPONSE_TOOL)),
        };

        let response = self.client.complete_message(&request).await?;
        let input = response
            .tool_input(RESPONSE_TOOL)
            .ok_or_else(|| SolaceError::Provider {
                message: "no therapeutic_response tool call in response".to_string(),
                source: None,
            })?;
        let output: ResponseToolOutput =
            serde_json::from_value(input.clone()).map_err(|e| SolaceError::Provider {
                message: format!("malformed therapeutic_response output: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(AgentReply {
            text: output.response,
            techniques: output.techniques,
            tone: output.emotional_tone,
            follow_ups: output.follow_up_questions,
        })
    }
}
