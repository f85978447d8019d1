//! Sentiment classification through the OpenAI chat completions API.
//!
//! The model is prompted to answer with strict JSON
//! `{"label": "positive|neutral|negative", "score": NUMBER}`. Any transport
//! failure, HTTP error, or malformed answer surfaces as a `SentimentError`;
//! the review handlers decide how to degrade.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    Sentiment, SentimentError, SentimentProvider, LABEL_NEGATIVE, LABEL_NEUTRAL, LABEL_POSITIVE,
};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4.1-mini";

const SYSTEM_PROMPT: &str = "You are a strict sentiment classifier for movie reviews.\n\
Read the review and return ONLY valid JSON, nothing else.\n\
The JSON must be exactly of the form:\n\
{\"label\": \"positive|neutral|negative\", \"score\": NUMBER}\n\
Where score is between -1.0 and 1.0 (negative = very negative, \
positive = very positive, 0 = neutral).";

pub struct OpenAiSentiment {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Classification {
    label: String,
    score: f64,
}

impl OpenAiSentiment {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SentimentProvider for OpenAiSentiment {
    async fn classify(&self, text: &str) -> Result<Sentiment, SentimentError> {
        if self.api_key.is_empty() {
            return Err(SentimentError::NotConfigured(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }

        let payload = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": text },
            ],
            "response_format": { "type": "json_object" },
        });

        let resp = self
            .http
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SentimentError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SentimentError::Upstream {
                status: resp.status().as_u16(),
            });
        }

        let completion: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| SentimentError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| SentimentError::InvalidResponse("no choices returned".to_string()))?;

        parse_classification(content)
    }
}

fn parse_classification(content: &str) -> Result<Sentiment, SentimentError> {
    let parsed: Classification = serde_json::from_str(content)
        .map_err(|e| SentimentError::InvalidResponse(format!("bad JSON answer: {}", e)))?;

    let label = parsed.label.to_lowercase();
    if !matches!(label.as_str(), LABEL_POSITIVE | LABEL_NEUTRAL | LABEL_NEGATIVE) {
        return Err(SentimentError::InvalidResponse(format!(
            "invalid label '{}'",
            parsed.label
        )));
    }

    Ok(Sentiment {
        label,
        score: parsed.score.clamp(-1.0, 1.0),
    })
}
