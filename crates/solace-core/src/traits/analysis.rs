// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analysis Pipeline trait: sentiment scoring and crisis screening.

use async_trait::async_trait;

use crate::error::SolaceError;
use crate::types::{CrisisAssessment, SentimentResult};

/// AI-backed text analysis consumed by the message pipeline.
///
/// Both calls are best-effort from the engine's point of view: a failure
/// degrades the message to absent analysis data rather than rejecting it.
/// The two assessments are independent and may run concurrently.
#[async_trait]
pub trait AnalysisPipeline: Send + Sync {
    /// Scores the emotional content of the text.
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentResult, SolaceError>;

    /// Screens the text for crisis indicators.
    async fn detect_crisis(&self, text: &str) -> Result<CrisisAssessment, SolaceError>;
}
