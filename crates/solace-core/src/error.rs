// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Solace conversation engine.

use thiserror::Error;

/// The primary error type used across all Solace collaborator traits and
/// engine operations.
#[derive(Debug, Error)]
pub enum SolaceError {
    /// Credential verification failed. Deliberately carries no cause: the
    /// specific reason (expired, malformed, inactive account) is recorded in
    /// the audit log only, never returned to the caller.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The caller is not permitted to act on the target resource
    /// (not a member of the room, does not own the conversation, or the
    /// conversation is no longer active).
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// An admission limiter rejected the request.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Malformed input (unparseable event, empty content, unknown fields).
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Sentiment or crisis analysis could not be performed. Absorbed by the
    /// pipeline: the message proceeds without analysis data.
    #[error("analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    /// The reply generator failed; the user message is already persisted.
    #[error("reply generation failed: {message}")]
    GenerationFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Persistence layer error. Always surfaced; aborts the current
    /// message's pipeline.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Upstream model provider error (API failure, unexpected response shape).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SolaceError {
    /// Stable machine-readable code for the wire `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            SolaceError::AuthenticationFailed => "authentication-failed",
            SolaceError::AuthorizationDenied(_) => "authorization-denied",
            SolaceError::RateLimited { .. } => "rate-limited",
            SolaceError::ValidationFailed(_) => "validation-failed",
            SolaceError::AnalysisUnavailable(_) => "analysis-unavailable",
            SolaceError::GenerationFailed { .. } => "generation-failed",
            SolaceError::NotFound(_) => "not-found",
            SolaceError::Storage { .. } => "store-failure",
            SolaceError::Provider { .. } => "provider-error",
            SolaceError::Config(_) => "config-error",
            SolaceError::Timeout { .. } => "timeout",
            SolaceError::Internal(_) => "internal-error",
        }
    }
}
