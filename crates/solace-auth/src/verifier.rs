// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential verification against the signing secret and the user table.
//!
//! Every failure is the uniform `AuthenticationFailed` to the caller; the
//! specific cause is recorded only in the audit log (`target: "audit"`),
//! so the handshake does not act as an oracle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use solace_core::{ConversationStore, CredentialVerifier, Identity, SolaceError};

use crate::token;

/// Verifies HS256 bearer tokens and re-confirms the account is still active
/// in the store's user table on every handshake. A previously valid token
/// for a now-deactivated account is rejected.
pub struct TokenVerifier {
    secret: String,
    store: Arc<dyn ConversationStore>,
}

impl TokenVerifier {
    pub fn new(secret: String, store: Arc<dyn ConversationStore>) -> Self {
        Self { secret, store }
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("secret", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl CredentialVerifier for TokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, SolaceError> {
        let now = chrono::Utc::now().timestamp();
        let claims = match token::verify(&self.secret, token, now) {
            Ok(claims) => claims,
            Err(rejection) => {
                warn!(target: "audit", reason = %rejection, "credential rejected");
                return Err(SolaceError::AuthenticationFailed);
            }
        };

        // The token alone is not enough: the account must still be active.
        // A store failure here is infrastructure, not a verification
        // verdict, and surfaces as Storage.
        let user = self.store.get_user(&claims.sub).await?;
        match user {
            None => {
                warn!(target: "audit", user_id = %claims.sub, reason = "unknown user", "credential rejected");
                Err(SolaceError::AuthenticationFailed)
            }
            Some(user) if !user.active => {
                warn!(target: "audit", user_id = %user.id, reason = "inactive account", "credential rejected");
                Err(SolaceError::AuthenticationFailed)
            }
            Some(user) => Ok(Identity {
                user_id: user.id,
                role: user.role,
                active: true,
            }),
        }
    }
}
