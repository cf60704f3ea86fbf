// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User table operations.
//!
//! Registration and credential storage are external concerns; the engine
//! needs the user table only to confirm that an identity is (still) active.

use rusqlite::params;
use solace_core::{SolaceError, UserRecord};

use crate::database::Database;

/// Insert a new user row.
pub async fn create_user(db: &Database, user: &UserRecord) -> Result<(), SolaceError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, email, role, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.email,
                    user.role,
                    user.active,
                    user.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<UserRecord>, SolaceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, role, active, created_at FROM users WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    role: row.get(2)?,
                    active: row.get(3)?,
                    created_at: row.get(4)?,
                })
            });
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip a user's active flag.
pub async fn set_user_active(db: &Database, id: &str, active: bool) -> Result<(), SolaceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET active = ?1 WHERE id = ?2",
                params![active, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
