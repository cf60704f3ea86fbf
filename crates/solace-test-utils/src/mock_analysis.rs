// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock analysis pipeline for deterministic testing.
//!
//! Scripted results are popped from FIFO queues; an empty queue falls back
//! to a neutral default. Failure switches force every call to error, which
//! the engine must absorb as a degrade.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use solace_core::{AnalysisPipeline, CrisisAssessment, RiskLevel, SentimentResult, SolaceError};

/// A mock analysis pipeline with scripted sentiment and crisis results.
#[derive(Default)]
pub struct MockAnalysis {
    sentiments: Mutex<VecDeque<SentimentResult>>,
    crises: Mutex<VecDeque<CrisisAssessment>>,
    fail_sentiment: AtomicBool,
    fail_crisis: AtomicBool,
}

impl MockAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a sentiment result for the next call.
    pub async fn queue_sentiment(&self, result: SentimentResult) {
        self.sentiments.lock().await.push_back(result);
    }

    /// Queue a crisis assessment for the next call.
    pub async fn queue_crisis(&self, assessment: CrisisAssessment) {
        self.crises.lock().await.push_back(assessment);
    }

    /// Force every sentiment call to fail.
    pub fn fail_sentiment(&self, fail: bool) {
        self.fail_sentiment.store(fail, Ordering::SeqCst);
    }

    /// Force every crisis call to fail.
    pub fn fail_crisis(&self, fail: bool) {
        self.fail_crisis.store(fail, Ordering::SeqCst);
    }

    /// Neutral default sentiment.
    pub fn neutral_sentiment() -> SentimentResult {
        SentimentResult {
            score: 0.1,
            emotions: BTreeMap::from([("joy".to_string(), 0.4)]),
            keywords: Vec::new(),
        }
    }

    /// Non-crisis default assessment.
    pub fn clear_assessment() -> CrisisAssessment {
        CrisisAssessment {
            is_crisis: false,
            risk_level: RiskLevel::Low,
            indicators: Vec::new(),
        }
    }

    /// A positive crisis assessment for escalation tests.
    pub fn crisis_assessment() -> CrisisAssessment {
        CrisisAssessment {
            is_crisis: true,
            risk_level: RiskLevel::High,
            indicators: vec!["expressed desire to not be here".to_string()],
        }
    }
}

#[async_trait]
impl AnalysisPipeline for MockAnalysis {
    async fn analyze_sentiment(&self, _text: &str) -> Result<SentimentResult, SolaceError> {
        if self.fail_sentiment.load(Ordering::SeqCst) {
            return Err(SolaceError::Provider {
                message: "mock sentiment failure".into(),
                source: None,
            });
        }
        Ok(self
            .sentiments
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(Self::neutral_sentiment))
    }

    async fn detect_crisis(&self, _text: &str) -> Result<CrisisAssessment, SolaceError> {
        if self.fail_crisis.load(Ordering::SeqCst) {
            return Err(SolaceError::Provider {
                message: "mock crisis failure".into(),
                source: None,
            });
        }
        Ok(self
            .crises
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(Self::clear_assessment))
    }
}
