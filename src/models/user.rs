use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{Document, StoreError};

/// Users are keyed by the identity provider's uid and created lazily on the
/// first authenticated request. Never deleted by this system.
pub const COLLECTION: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }

    /// Document fields for persistence; the uid doubles as the document id.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("uid".to_string(), Value::String(self.uid.clone()));
        fields.insert("email".to_string(), Value::String(self.email.clone()));
        fields.insert(
            "created_at".to_string(),
            Value::String(self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        fields
    }

    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(doc.fields))
            .map_err(|e| StoreError::Codec(format!("malformed user document: {}", e)))
    }
}
