//! Sentiment classification of review text.
//!
//! Two providers share one capability: `classify(text) -> {label, score}`.
//! Provider failures never fail a review write; callers degrade to null
//! sentiment fields instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;
pub mod openai;

pub use mock::MockSentiment;
pub use openai::OpenAiSentiment;

pub const LABEL_POSITIVE: &str = "positive";
pub const LABEL_NEUTRAL: &str = "neutral";
pub const LABEL_NEGATIVE: &str = "negative";

/// Classification result: label in {positive, neutral, negative}, score in
/// [-1.0, 1.0] (negative .. positive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

impl Sentiment {
    /// Label a score by the shared thresholds: > 0.1 positive, < -0.1
    /// negative, else neutral.
    pub fn from_score(score: f64) -> Self {
        let score = score.clamp(-1.0, 1.0);
        let label = if score > 0.1 {
            LABEL_POSITIVE
        } else if score < -0.1 {
            LABEL_NEGATIVE
        } else {
            LABEL_NEUTRAL
        };
        Self {
            label: label.to_string(),
            score,
        }
    }
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider returned status {status}")]
    Upstream { status: u16 },

    #[error("provider returned an invalid classification: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment, SentimentError>;
}
