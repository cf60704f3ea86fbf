// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message table operations.
//!
//! Messages are append-only. `created_at` plus rowid gives a total order
//! per conversation; that order builds reply context and replays to late
//! joiners.

use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::params;
use rusqlite::types::Type;
use solace_core::{
    ContentType, CrisisAssessment, Message, MessageRole, ReplyMetadata, RiskLevel, SentimentResult,
    SolaceError,
};

use crate::database::Database;

const SELECT_COLUMNS: &str = "id, conversation_id, role, content, content_type, audio_url, \
                              sentiment_score, emotions, dominant_emotion, keywords, \
                              is_flagged, risk_level, flag_indicators, reply_meta, created_at";

fn json_err(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let role_str: String = row.get(2)?;
    let role = MessageRole::from_str(&role_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let content_type_str: String = row.get(4)?;
    let content_type = ContentType::from_str(&content_type_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let sentiment_score: Option<f64> = row.get(6)?;
    let emotions_json: Option<String> = row.get(7)?;
    let keywords_json: Option<String> = row.get(9)?;
    let sentiment = match (sentiment_score, emotions_json) {
        (Some(score), Some(emotions_json)) => {
            let emotions: BTreeMap<String, f32> =
                serde_json::from_str(&emotions_json).map_err(|e| json_err(7, e))?;
            let keywords: Vec<String> = match keywords_json {
                Some(json) => serde_json::from_str(&json).map_err(|e| json_err(9, e))?,
                None => Vec::new(),
            };
            Some(SentimentResult {
                score: score as f32,
                emotions,
                keywords,
            })
        }
        _ => None,
    };

    let is_flagged: bool = row.get(10)?;
    let risk_level_str: Option<String> = row.get(11)?;
    let indicators_json: Option<String> = row.get(12)?;
    let crisis = match risk_level_str {
        Some(level_str) => {
            let risk_level = RiskLevel::from_str(&level_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e))
            })?;
            let indicators: Vec<String> = match indicators_json {
                Some(json) => serde_json::from_str(&json).map_err(|e| json_err(12, e))?,
                None => Vec::new(),
            };
            Some(CrisisAssessment {
                is_crisis: is_flagged,
                risk_level,
                indicators,
            })
        }
        None => None,
    };

    let reply_meta_json: Option<String> = row.get(13)?;
    let reply_meta: Option<ReplyMetadata> = match reply_meta_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| json_err(13, e))?),
        None => None,
    };

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        content_type,
        audio_url: row.get(5)?,
        sentiment,
        crisis,
        reply_meta,
        created_at: row.get(14)?,
    })
}

/// Append a message with whatever analysis data is attached to it.
pub async fn append_message(db: &Database, message: &Message) -> Result<(), SolaceError> {
    let msg = message.clone();
    db.connection()
        .call(move |conn| {
            let (sentiment_score, emotions, dominant_emotion, keywords) = match &msg.sentiment {
                Some(s) => (
                    Some(f64::from(s.score)),
                    Some(
                        serde_json::to_string(&s.emotions)
                            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
                    ),
                    s.dominant_emotion().map(|e| e.to_string()),
                    Some(
                        serde_json::to_string(&s.keywords)
                            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
                    ),
                ),
                None => (None, None, None, None),
            };
            let (is_flagged, risk_level, flag_indicators) = match &msg.crisis {
                Some(c) => (
                    c.is_crisis,
                    Some(c.risk_level.to_string()),
                    Some(
                        serde_json::to_string(&c.indicators)
                            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
                    ),
                ),
                None => (false, None, None),
            };
            let reply_meta = match &msg.reply_meta {
                Some(meta) => Some(
                    serde_json::to_string(meta)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
                ),
                None => None,
            };

            conn.execute(
                "INSERT INTO messages (id, conversation_id, role, content, content_type,
                                       audio_url, sentiment_score, emotions, dominant_emotion,
                                       keywords, is_flagged, risk_level, flag_indicators,
                                       reply_meta, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.role.to_string(),
                    msg.content,
                    msg.content_type.to_string(),
                    msg.audio_url,
                    sentiment_score,
                    emotions,
                    dominant_emotion,
                    keywords,
                    is_flagged,
                    risk_level,
                    flag_indicators,
                    reply_meta,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All messages of a conversation in creation order.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, SolaceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recent `limit` messages, returned in chronological order.
pub async fn list_recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: i64,
) -> Result<Vec<Message>, SolaceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![conversation_id, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            // Tail of the conversation, flipped back to chronological order.
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::create_conversation;
    use crate::queries::users::create_user;
    use solace_core::{Conversation, ConversationStatus, UserRecord};
    use tempfile::tempdir;

    async fn setup_db_with_conversation() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let user = UserRecord {
            id: "user-1".to_string(),
            email: None,
            role: "user".to_string(),
            active: true,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_user(&db, &user).await.unwrap();
        let conversation = Conversation {
            id: "conv-1".to_string(),
            user_id: "user-1".to_string(),
            title: "t".to_string(),
            status: ConversationStatus::Active,
            crisis: false,
            mood_start: None,
            mood_end: None,
            techniques: vec![],
            summary: None,
            started_at: "2026-01-01T00:00:00.000Z".to_string(),
            ended_at: None,
        };
        create_conversation(&db, &conversation).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, role: MessageRole, content: &str, timestamp: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            role,
            content: content.to_string(),
            content_type: ContentType::Text,
            audio_url: None,
            sentiment: None,
            crisis: None,
            reply_meta: None,
            created_at: timestamp.to_string(),
        }
    }

    #[tokio::test]
    async fn append_and_list_messages_in_order() {
        let (db, _dir) = setup_db_with_conversation().await;

        let m1 = make_msg("m1", MessageRole::User, "hello", "2026-01-01T00:00:01.000Z");
        let m2 = make_msg(
            "m2",
            MessageRole::Assistant,
            "hi there",
            "2026-01-01T00:00:02.000Z",
        );
        let m3 = make_msg(
            "m3",
            MessageRole::User,
            "how are you?",
            "2026-01-01T00:00:03.000Z",
        );

        append_message(&db, &m1).await.unwrap();
        append_message(&db, &m2).await.unwrap();
        append_message(&db, &m3).await.unwrap();

        let messages = list_messages(&db, "conv-1").await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[1].id, "m2");
        assert_eq!(messages[2].id, "m3");
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn identical_timestamps_keep_insertion_order() {
        let (db, _dir) = setup_db_with_conversation().await;
        let ts = "2026-01-01T00:00:01.000Z";
        for i in 0..4 {
            let msg = make_msg(&format!("m{i}"), MessageRole::User, &format!("msg {i}"), ts);
            append_message(&db, &msg).await.unwrap();
        }

        let messages = list_messages(&db, "conv-1").await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m0", "m1", "m2", "m3"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_recent_returns_tail_in_chronological_order() {
        let (db, _dir) = setup_db_with_conversation().await;
        for i in 0..5 {
            let msg = make_msg(
                &format!("m{i}"),
                MessageRole::User,
                &format!("msg {i}"),
                &format!("2026-01-01T00:00:0{i}.000Z"),
            );
            append_message(&db, &msg).await.unwrap();
        }

        let recent = list_recent_messages(&db, "conv-1", 3).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m2", "m3", "m4"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn analysis_columns_round_trip() {
        let (db, _dir) = setup_db_with_conversation().await;

        let mut msg = make_msg(
            "m-analyzed",
            MessageRole::User,
            "I feel awful",
            "2026-01-01T00:00:01.000Z",
        );
        msg.sentiment = Some(SentimentResult {
            score: -0.8,
            emotions: BTreeMap::from([("sadness".to_string(), 0.9), ("fear".to_string(), 0.3)]),
            keywords: vec!["awful".to_string()],
        });
        msg.crisis = Some(CrisisAssessment {
            is_crisis: true,
            risk_level: RiskLevel::High,
            indicators: vec!["hopeless language".to_string()],
        });
        append_message(&db, &msg).await.unwrap();

        let messages = list_messages(&db, "conv-1").await.unwrap();
        let loaded = &messages[0];
        let sentiment = loaded.sentiment.as_ref().unwrap();
        assert!((sentiment.score - -0.8).abs() < 1e-6);
        assert_eq!(sentiment.dominant_emotion(), Some("sadness"));
        assert_eq!(sentiment.keywords, vec!["awful"]);
        let crisis = loaded.crisis.as_ref().unwrap();
        assert!(crisis.is_crisis);
        assert_eq!(crisis.risk_level, RiskLevel::High);
        assert_eq!(crisis.indicators, vec!["hopeless language"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reply_metadata_round_trips() {
        let (db, _dir) = setup_db_with_conversation().await;

        let mut msg = make_msg(
            "m-reply",
            MessageRole::Assistant,
            "That sounds hard.",
            "2026-01-01T00:00:02.000Z",
        );
        msg.reply_meta = Some(ReplyMetadata {
            techniques: vec!["active-listening".to_string()],
            tone: "supportive".to_string(),
            follow_ups: vec!["What felt hardest?".to_string()],
        });
        append_message(&db, &msg).await.unwrap();

        let messages = list_messages(&db, "conv-1").await.unwrap();
        let meta = messages[0].reply_meta.as_ref().unwrap();
        assert_eq!(meta.techniques, vec!["active-listening"]);
        assert_eq!(meta.tone, "supportive");
        assert_eq!(meta.follow_ups.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn messages_without_analysis_load_with_absent_fields() {
        let (db, _dir) = setup_db_with_conversation().await;
        let msg = make_msg("m-plain", MessageRole::User, "hi", "2026-01-01T00:00:01.000Z");
        append_message(&db, &msg).await.unwrap();

        let messages = list_messages(&db, "conv-1").await.unwrap();
        assert!(messages[0].sentiment.is_none());
        assert!(messages[0].crisis.is_none());
        assert!(messages[0].reply_meta.is_none());

        db.close().await.unwrap();
    }
}
