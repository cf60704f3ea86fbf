// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `solace token` command implementation.
//!
//! Mints an HS256 bearer token for a user, optionally seeding the user row
//! so the verifier's active-account check passes.

use solace_config::SolaceConfig;
use solace_core::{ConversationStore, SolaceError, UserRecord};
use solace_storage::SqliteStore;

use crate::TokenArgs;

/// Runs the `solace token` command.
pub async fn run_token(config: SolaceConfig, args: TokenArgs) -> Result<(), SolaceError> {
    let secret = config
        .auth
        .token_secret
        .clone()
        .ok_or_else(|| SolaceError::Config("auth.token_secret is required".into()))?;

    if args.create_user {
        let store = SqliteStore::new(config.storage.clone());
        store.initialize().await?;
        if store.get_user(&args.user_id).await?.is_none() {
            store
                .create_user(&UserRecord {
                    id: args.user_id.clone(),
                    email: args.email.clone(),
                    role: "user".to_string(),
                    active: true,
                    created_at: chrono::Utc::now().to_rfc3339(),
                })
                .await?;
            eprintln!("solace: created user {}", args.user_id);
        }
        store.close().await?;
    }

    let ttl = args.ttl_secs.unwrap_or(config.auth.token_ttl_secs);
    let token = solace_auth::mint(&secret, &args.user_id, ttl)?;
    println!("{token}");
    Ok(())
}
