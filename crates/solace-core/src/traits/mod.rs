// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the conversation engine.
//!
//! The engine depends only on these seams; concrete implementations live in
//! `solace-storage`, `solace-anthropic`, and `solace-auth`, with mock
//! implementations in `solace-test-utils`.

pub mod analysis;
pub mod responder;
pub mod store;
pub mod verifier;

pub use analysis::AnalysisPipeline;
pub use responder::ResponseGenerator;
pub use store::ConversationStore;
pub use verifier::CredentialVerifier;
