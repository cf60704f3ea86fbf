// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic-backed analysis pipeline and response generator.
//!
//! Implements the `AnalysisPipeline` and `ResponseGenerator` collaborator
//! traits over the Anthropic Messages API. Structured outputs are obtained
//! by forcing a single tool per request and deserializing its `tool_use`
//! input block.

pub mod analysis;
pub mod client;
pub mod responder;
pub mod types;

pub use analysis::AnthropicAnalysis;
pub use client::AnthropicClient;
pub use responder::AnthropicResponder;
