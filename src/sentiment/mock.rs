//! Deterministic keyword-based sentiment scorer. No network; used when
//! `SENTIMENT_PROVIDER=mock` and throughout the test suite.

use async_trait::async_trait;

use super::{Sentiment, SentimentError, SentimentProvider};

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "amazing",
    "awesome",
    "love",
    "loved",
    "excellent",
    "fantastic",
    "enjoyed",
    "liked",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "boring",
    "terrible",
    "awful",
    "hate",
    "hated",
    "disappointing",
    "disappointed",
    "slow",
    "did not like",
    "didn't like",
    "worst",
];

#[derive(Default)]
pub struct MockSentiment;

impl MockSentiment {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SentimentProvider for MockSentiment {
    async fn classify(&self, text: &str) -> Result<Sentiment, SentimentError> {
        let lowered = text.to_lowercase();
        let mut score = 0.0;

        for word in POSITIVE_WORDS {
            if lowered.contains(word) {
                score += 0.2;
            }
        }
        for word in NEGATIVE_WORDS {
            if lowered.contains(word) {
                score -= 0.25;
            }
        }

        Ok(Sentiment::from_score(score))
    }
}
