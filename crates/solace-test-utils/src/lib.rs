// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Solace integration tests: mock collaborators and the
//! engine harness.

pub mod harness;
pub mod mock_analysis;
pub mod mock_responder;
pub mod mock_verifier;

pub use harness::{EngineHarness, EngineHarnessBuilder, TestConnection};
pub use mock_analysis::MockAnalysis;
pub use mock_responder::MockResponder;
pub use mock_verifier::StaticVerifier;
