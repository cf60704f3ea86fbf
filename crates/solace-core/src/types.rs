// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Solace workspace.
//!
//! Wire-facing structs serialize with camelCase field names to match the
//! room protocol; enums serialize as their lowercase/kebab-case names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for one live transport connection.
///
/// Assigned at handshake, never reused for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A verified identity resolved from a credential at handshake.
///
/// Immutable for the lifetime of a session; sessions are torn down if the
/// backing user record becomes inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
    pub active: bool,
}

/// A row in the store's user table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub role: String,
    pub active: bool,
    pub created_at: String,
}

/// Lifecycle status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Completed,
}

/// A logical conversation thread owned by one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: ConversationStatus,
    /// Monotonic: once set, never cleared by the engine.
    pub crisis: bool,
    pub mood_start: Option<String>,
    pub mood_end: Option<String>,
    /// Technique tags accumulated across generated replies.
    pub techniques: Vec<String>,
    pub summary: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Author role of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Content type of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Text,
    AudioTranscript,
}

/// An ordered, append-only entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crisis: Option<CrisisAssessment>,
    /// Present on assistant messages: techniques, tone, follow-up questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_meta: Option<ReplyMetadata>,
    pub created_at: String,
}

/// Generation metadata attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    pub techniques: Vec<String>,
    pub tone: String,
    pub follow_ups: Vec<String>,
}

/// Sentiment score and per-emotion intensities for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Overall sentiment in [-1, 1].
    pub score: f32,
    /// Emotion vocabulary mapped to intensities in [0, 1]. A `BTreeMap` so
    /// iteration order (and therefore dominant-emotion tie-breaking) is
    /// deterministic.
    pub emotions: BTreeMap<String, f32>,
    /// Key emotional words or phrases.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SentimentResult {
    /// The emotion with the maximum intensity.
    ///
    /// Ties resolve to the first maximum in the map's lexicographic
    /// iteration order: an equal later intensity never displaces an
    /// earlier one.
    pub fn dominant_emotion(&self) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for (emotion, &intensity) in &self.emotions {
            match best {
                Some((_, current)) if intensity <= current => {}
                _ => best = Some((emotion, intensity)),
            }
        }
        best.map(|(emotion, _)| emotion)
    }
}

/// Ordered crisis risk level. Only the ordering is meaningful; no numeric
/// scale is assumed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Crisis screening verdict for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisAssessment {
    pub is_crisis: bool,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// One history entry handed to the response generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Conversation-level mood and technique context for reply generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodContext {
    pub user_mood: Option<String>,
    pub techniques: Vec<String>,
}

/// The generator's next agent utterance plus metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentReply {
    pub text: String,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_emotion_tie_resolves_to_lexicographically_first() {
        let result = SentimentResult {
            score: -0.1,
            emotions: BTreeMap::from([
                ("joy".to_string(), 0.4),
                ("sadness".to_string(), 0.4),
                ("anger".to_string(), 0.1),
            ]),
            keywords: vec![],
        };
        // anger iterates first but loses on intensity; joy and sadness tie
        // at 0.4 and joy iterates before sadness.
        assert_eq!(result.dominant_emotion(), Some("joy"));
    }

    #[test]
    fn dominant_emotion_of_empty_map_is_none() {
        let result = SentimentResult {
            score: 0.0,
            emotions: BTreeMap::new(),
            keywords: vec![],
        };
        assert_eq!(result.dominant_emotion(), None);
    }

    #[test]
    fn dominant_emotion_is_stable_across_calls() {
        let result = SentimentResult {
            score: 0.0,
            emotions: BTreeMap::from([
                ("fear".to_string(), 0.5),
                ("disgust".to_string(), 0.5),
            ]),
            keywords: vec![],
        };
        let first = result.dominant_emotion().map(String::from);
        for _ in 0..10 {
            assert_eq!(result.dominant_emotion(), first.as_deref());
        }
        assert_eq!(first.as_deref(), Some("disgust"));
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn risk_level_round_trips_through_strings() {
        use std::str::FromStr;
        for level in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            let s = level.to_string();
            assert_eq!(RiskLevel::from_str(&s).unwrap(), level);
        }
    }

    #[test]
    fn content_type_uses_kebab_case() {
        assert_eq!(ContentType::AudioTranscript.to_string(), "audio-transcript");
        let parsed: ContentType = serde_json::from_str("\"audio-transcript\"").unwrap();
        assert_eq!(parsed, ContentType::AudioTranscript);
    }

    #[test]
    fn message_serializes_camel_case_and_skips_absent_analysis() {
        let msg = Message {
            id: "m1".into(),
            conversation_id: "c1".into(),
            role: MessageRole::User,
            content: "hello".into(),
            content_type: ContentType::Text,
            audio_url: None,
            sentiment: None,
            crisis: None,
            reply_meta: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["conversationId"], "c1");
        assert_eq!(json["contentType"], "text");
        assert!(json.get("sentiment").is_none());
        assert!(json.get("crisis").is_none());
    }

    #[test]
    fn conversation_status_round_trips() {
        use std::str::FromStr;
        assert_eq!(ConversationStatus::Active.to_string(), "active");
        assert_eq!(
            ConversationStatus::from_str("completed").unwrap(),
            ConversationStatus::Completed
        );
    }
}
