// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Solace conversation engine.
//!
//! This crate provides the error taxonomy, domain types, and collaborator
//! trait definitions used throughout the Solace workspace. The engine crate
//! depends only on the traits defined here; concrete backends plug in behind
//! them.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SolaceError;
pub use types::{
    AgentReply, ConnectionId, ContentType, Conversation, ConversationStatus, CrisisAssessment,
    HistoryMessage, Identity, Message, MessageRole, MoodContext, ReplyMetadata, RiskLevel,
    SentimentResult, UserRecord,
};

pub use traits::{AnalysisPipeline, ConversationStore, CredentialVerifier, ResponseGenerator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _auth = SolaceError::AuthenticationFailed;
        let _denied = SolaceError::AuthorizationDenied("not your conversation".into());
        let _limited = SolaceError::RateLimited {
            retry_after_secs: 30,
        };
        let _validation = SolaceError::ValidationFailed("empty content".into());
        let _analysis = SolaceError::AnalysisUnavailable("classifier timeout".into());
        let _generation = SolaceError::GenerationFailed {
            message: "provider returned 500".into(),
            source: None,
        };
        let _missing = SolaceError::NotFound("conversation".into());
        let _storage = SolaceError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = SolaceError::Provider {
            message: "test".into(),
            source: None,
        };
        let _timeout = SolaceError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = SolaceError::Internal("test".into());
    }

    #[test]
    fn trait_objects_are_constructible() {
        // Compile-time check that the collaborator traits are object-safe;
        // the engine holds all of them as Arc<dyn Trait>.
        fn _store(_: &dyn ConversationStore) {}
        fn _analysis(_: &dyn AnalysisPipeline) {}
        fn _responder(_: &dyn ResponseGenerator) {}
        fn _verifier(_: &dyn CredentialVerifier) {}
    }
}
