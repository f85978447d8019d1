use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::sentiment::Sentiment;
use crate::store::{Document, StoreError};

pub const COLLECTION: &str = "reviews";

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// A stored review. `user_id` is fixed at creation; the sentiment fields are
/// derived from `body` and may be null when the provider was unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub movie_id: String,
    pub user_id: String,
    pub rating: i64,
    pub body: String,
    pub sentiment_label: Option<String>,
    pub sentiment_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let mut fields = doc.fields;
        fields.insert("id".to_string(), Value::String(doc.id));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::Codec(format!("malformed review document: {}", e)))
    }
}

/// `POST /reviews` request body.
#[derive(Debug, Deserialize)]
pub struct ReviewCreate {
    pub movie_id: String,
    pub rating: i64,
    pub body: String,
}

impl ReviewCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_rating(self.rating)?;
        validate_body(&self.body)?;
        if self.movie_id.trim().is_empty() {
            return Err(ApiError::validation_error("movie_id must not be empty"));
        }
        Ok(())
    }

    /// Document fields for a freshly created review.
    pub fn to_fields(
        &self,
        user_id: &str,
        sentiment: Option<&Sentiment>,
        now: DateTime<Utc>,
    ) -> Map<String, Value> {
        let ts = Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true));
        let mut fields = Map::new();
        fields.insert("movie_id".to_string(), Value::String(self.movie_id.clone()));
        fields.insert("user_id".to_string(), Value::String(user_id.to_string()));
        fields.insert("rating".to_string(), Value::from(self.rating));
        fields.insert("body".to_string(), Value::String(self.body.clone()));
        fields.insert(
            "sentiment_label".to_string(),
            sentiment.map_or(Value::Null, |s| Value::String(s.label.clone())),
        );
        fields.insert(
            "sentiment_score".to_string(),
            sentiment.map_or(Value::Null, |s| {
                serde_json::Number::from_f64(s.score).map_or(Value::Null, Value::Number)
            }),
        );
        fields.insert("created_at".to_string(), ts.clone());
        fields.insert("updated_at".to_string(), ts);
        fields
    }
}

/// `PATCH /reviews/{id}` request body; absent fields stay unchanged.
#[derive(Debug, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i64>,
    pub body: Option<String>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        if let Some(body) = &self.body {
            validate_body(body)?;
        }
        Ok(())
    }
}

fn validate_rating(rating: i64) -> Result<(), ApiError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::validation_error(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::validation_error("body must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_payload(rating: i64, body: &str) -> ReviewCreate {
        ReviewCreate {
            movie_id: "m1".to_string(),
            rating,
            body: body.to_string(),
        }
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(create_payload(1, "ok").validate().is_ok());
        assert!(create_payload(5, "ok").validate().is_ok());
        assert!(create_payload(0, "ok").validate().is_err());
        assert!(create_payload(6, "ok").validate().is_err());
    }

    #[test]
    fn blank_body_is_rejected() {
        assert!(create_payload(3, "   ").validate().is_err());
        assert!(ReviewUpdate {
            rating: None,
            body: Some(String::new())
        }
        .validate()
        .is_err());
    }

    #[test]
    fn fields_round_trip_through_a_document() {
        let payload = create_payload(4, "great film");
        let sentiment = Sentiment::from_score(0.4);
        let fields = payload.to_fields("uid-1", Some(&sentiment), Utc::now());

        let review = Review::from_document(Document {
            id: "r1".to_string(),
            fields,
        })
        .unwrap();

        assert_eq!(review.id, "r1");
        assert_eq!(review.user_id, "uid-1");
        assert_eq!(review.rating, 4);
        assert_eq!(review.sentiment_label.as_deref(), Some("positive"));
        assert_eq!(review.created_at, review.updated_at);
    }

    #[test]
    fn null_sentiment_fields_deserialize_as_none() {
        let fields = create_payload(2, "meh").to_fields("uid-1", None, Utc::now());
        assert_eq!(fields["sentiment_label"], json!(null));

        let review = Review::from_document(Document {
            id: "r2".to_string(),
            fields,
        })
        .unwrap();
        assert!(review.sentiment_label.is_none());
        assert!(review.sentiment_score.is_none());
    }
}
