// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential Verifier trait: resolves a bearer credential to a live identity.

use async_trait::async_trait;

use crate::error::SolaceError;
use crate::types::Identity;

/// Validates a bearer credential and resolves it to an active identity.
///
/// Every verification failure is the uniform
/// [`SolaceError::AuthenticationFailed`](crate::error::SolaceError) — the
/// cause is distinguished only in the audit log. Verification is read-only.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, SolaceError>;
}
