// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static credential verifier for gateway tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use solace_core::{CredentialVerifier, Identity, SolaceError};

/// Maps fixed token strings to identities; everything else fails with the
/// uniform authentication error, like the real verifier.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: Mutex<HashMap<String, Identity>>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `user_id`.
    pub fn allow(&self, token: &str, user_id: &str) {
        let identity = Identity {
            user_id: user_id.to_string(),
            role: "user".to_string(),
            active: true,
        };
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string(), identity);
    }

    /// Stop accepting `token`.
    pub fn revoke(&self, token: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token);
    }
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, SolaceError> {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
            .ok_or(SolaceError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allowed_token_resolves_and_revocation_sticks() {
        let verifier = StaticVerifier::new();
        verifier.allow("tok-1", "alice");

        let identity = verifier.verify("tok-1").await.unwrap();
        assert_eq!(identity.user_id, "alice");

        verifier.revoke("tok-1");
        assert!(verifier.verify("tok-1").await.is_err());
        assert!(verifier.verify("unknown").await.is_err());
    }
}
