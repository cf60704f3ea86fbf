// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentiment analysis and crisis detection over the Messages API.
//!
//! Each call forces a single tool so the model returns structured JSON:
//! `sentiment_analysis` for emotion scoring, `crisis_detection` for
//! screening. The engine treats both as best-effort and degrades on error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use solace_core::{
    AnalysisPipeline, CrisisAssessment, RiskLevel, SentimentResult, SolaceError,
};
use tracing::warn;

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest, ToolChoice, ToolDefinition};

const SENTIMENT_TOOL: &str = "sentiment_analysis";
const CRISIS_TOOL: &str = "crisis_detection";

const SENTIMENT_SYSTEM_PROMPT: &str =
    "You are a sentiment analysis expert. Analyze the emotional content of the text.";

const CRISIS_SYSTEM_PROMPT: &str = "You are a mental health crisis detection specialist. \
     Analyze text for crisis indicators including suicidal ideation, self-harm, severe \
     depression, or immediate danger. Be thorough but careful not to over-diagnose.";

/// Anthropic-backed implementation of the analysis pipeline.
pub struct AnthropicAnalysis {
    client: AnthropicClient,
    max_tokens: u32,
}

impl AnthropicAnalysis {
    pub fn new(client: AnthropicClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    fn sentiment_tool() -> ToolDefinition {
        ToolDefinition {
            name: SENTIMENT_TOOL.to_string(),
            description: "Analyze sentiment and emotions in text".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "sentiment": {
                        "type": "number",
                        "description": "Overall sentiment score from -1 (negative) to 1 (positive)"
                    },
                    "emotions": {
                        "type": "object",
                        "properties": {
                            "joy": {"type": "number"},
                            "sadness": {"type": "number"},
                            "anger": {"type": "number"},
                            "fear": {"type": "number"},
                            "surprise": {"type": "number"},
                            "disgust": {"type": "number"}
                        },
                        "description": "Emotion scores from 0 to 1"
                    },
                    "keywords": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Key emotional words or phrases"
                    }
                },
                "required": ["sentiment", "emotions", "keywords"]
            }),
        }
    }

    fn crisis_tool() -> ToolDefinition {
        ToolDefinition {
            name: CRISIS_TOOL.to_string(),
            description: "Detect crisis indicators in text".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "is_crisis": {
                        "type": "boolean",
                        "description": "Whether crisis indicators are present"
                    },
                    "risk_level": {
                        "type": "string",
                        "enum": ["low", "medium", "high", "critical"],
                        "description": "Overall risk level assessment"
                    },
                    "indicators": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Specific crisis indicators found"
                    }
                },
                "required": ["is_crisis", "risk_level", "indicators"]
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentimentToolOutput {
    sentiment: f32,
    emotions: BTreeMap<String, f32>,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CrisisToolOutput {
    is_crisis: bool,
    risk_level: RiskLevel,
    #[serde(default)]
    indicators: Vec<String>,
}

#[async_trait]
impl AnalysisPipeline for AnthropicAnalysis {
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult, SolaceError> {
        let request = MessageRequest {
            model: self.client.model().to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: format!("Analyze the sentiment and emotions in this text: \"{text}\""),
            }],
            system: Some(SENTIMENT_SYSTEM_PROMPT.to_string()),
            max_tokens: self.max_tokens,
            temperature: Some(0.3),
            tools: Some(vec![Self::sentiment_tool()]),
            tool_choice: Some(ToolChoice::tool(SENTIMENT_TOOL)),
        };

        let response = self.client.complete_message(&request).await?;
        let input = response
            .tool_input(SENTIMENT_TOOL)
            .ok_or_else(|| SolaceError::Provider {
                message: "no sentiment_analysis tool call in response".to_string(),
                source: None,
            })?;
        let output: SentimentToolOutput =
            serde_json::from_value(input.clone()).map_err(|e| SolaceError::Provider {
                message: format!("malformed sentiment_analysis output: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(SentimentResult {
            score: output.sentiment.clamp(-1.0, 1.0),
            emotions: output.emotions,
            keywords: output.keywords,
        })
    }

    async fn detect_crisis(&self, text: &str) -> Result<CrisisAssessment, SolaceError> {
        let request = MessageRequest {
            model: self.client.model().to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: format!("Analyze this text for crisis indicators: \"{text}\""),
            }],
            system: Some(CRISIS_SYSTEM_PROMPT.to_string()),
            max_tokens: self.max_tokens,
            temperature: Some(0.1),
            tools: Some(vec![Self::crisis_tool()]),
            tool_choice: Some(ToolChoice::tool(CRISIS_TOOL)),
        };

        let response = self.client.complete_message(&request).await?;
        let input = response
            .tool_input(CRISIS_TOOL)
            .ok_or_else(|| SolaceError::Provider {
                message: "no crisis_detection tool call in response".to_string(),
                source: None,
            })?;
        let output: CrisisToolOutput =
            serde_json::from_value(input.clone()).map_err(|e| SolaceError::Provider {
                message: format!("malformed crisis_detection output: {e}"),
                source: Some(Box::new(e)),
            })?;

        if output.is_crisis {
            warn!(
                target: "audit",
                risk_level = %output.risk_level,
                indicator_count = output.indicators.len(),
                "crisis indicators detected"
            );
        }

        Ok(CrisisAssessment {
            is_crisis: output.is_crisis,
            risk_level: output.risk_level,
            indicators: output.indicators,
        })
    }
}
