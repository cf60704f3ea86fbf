// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation table operations.

use std::str::FromStr;

use rusqlite::params;
use rusqlite::types::Type;
use solace_core::{Conversation, ConversationStatus, SolaceError};

use crate::database::Database;

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    let status_str: String = row.get(3)?;
    let status = ConversationStatus::from_str(&status_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let techniques_json: String = row.get(7)?;
    let techniques: Vec<String> = serde_json::from_str(&techniques_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        status,
        crisis: row.get(4)?,
        mood_start: row.get(5)?,
        mood_end: row.get(6)?,
        techniques,
        summary: row.get(8)?,
        started_at: row.get(9)?,
        ended_at: row.get(10)?,
    })
}

const SELECT_COLUMNS: &str = "id, user_id, title, status, crisis, mood_start, mood_end, \
                              techniques, summary, started_at, ended_at";

/// Insert a new conversation.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), SolaceError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            let techniques_json = serde_json::to_string(&c.techniques)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO conversations (id, user_id, title, status, crisis, mood_start,
                                            mood_end, techniques, summary, started_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    c.id,
                    c.user_id,
                    c.title,
                    c.status.to_string(),
                    c.crisis,
                    c.mood_start,
                    c.mood_end,
                    techniques_json,
                    c.summary,
                    c.started_at,
                    c.ended_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SolaceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a user's conversations, most recently started first.
pub async fn list_conversations(
    db: &Database,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Conversation>, SolaceError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM conversations WHERE user_id = ?1
                 ORDER BY started_at DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![user_id, limit, offset], row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the conversation's crisis flag. There is deliberately no query that
/// clears it.
pub async fn set_crisis_flag(db: &Database, conversation_id: &str) -> Result<(), SolaceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET crisis = 1 WHERE id = ?1",
                params![conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append technique tags to the conversation's accumulated set, skipping
/// tags already present. Read-modify-write inside one `call` so it is
/// serialized with every other write.
pub async fn append_techniques(
    db: &Database,
    conversation_id: &str,
    techniques: &[String],
) -> Result<(), SolaceError> {
    let conversation_id = conversation_id.to_string();
    let new_techniques = techniques.to_vec();
    db.connection()
        .call(move |conn| {
            let current_json: String = conn.query_row(
                "SELECT techniques FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            let mut current: Vec<String> = serde_json::from_str(&current_json)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            for technique in new_techniques {
                if !current.contains(&technique) {
                    current.push(technique);
                }
            }
            let merged = serde_json::to_string(&current)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "UPDATE conversations SET techniques = ?1 WHERE id = ?2",
                params![merged, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition a conversation to `completed` with end timestamp, closing
/// mood, and summary.
pub async fn end_conversation(
    db: &Database,
    conversation_id: &str,
    mood_end: Option<&str>,
    summary: &str,
    ended_at: &str,
) -> Result<(), SolaceError> {
    let conversation_id = conversation_id.to_string();
    let mood_end = mood_end.map(|s| s.to_string());
    let summary = summary.to_string();
    let ended_at = ended_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET status = 'completed', ended_at = ?1, mood_end = ?2, summary = ?3
                 WHERE id = ?4",
                params![ended_at, mood_end, summary, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
