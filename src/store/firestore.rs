//! Firestore document store client over the REST surface
//! (`firestore.googleapis.com/v1`). Authenticates with a service-account
//! JWT-bearer grant and caches the resulting access token until shortly
//! before expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::config::ServiceAccountKey;

use super::{Document, DocumentStore, Order, StoreError};

const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub struct FirestoreStore {
    http: reqwest::Client,
    key: ServiceAccountKey,
    /// `.../projects/{project}/databases/(default)/documents`
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            key.project_id
        );
        Self {
            http,
            key,
            base_url,
            token: Mutex::new(None),
        }
    }

    /// Exchange a signed service-account assertion for an access token,
    /// reusing the cached one until a minute before it expires.
    async fn access_token(&self) -> Result<String, StoreError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(cached.access_token.clone());
            }
        }

        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: FIRESTORE_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| StoreError::Credentials(format!("failed to sign assertion: {}", e)))?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Credentials(format!(
                "token exchange failed with {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Credentials(format!("bad token response: {}", e)))?;

        let expires_at = now + Duration::seconds(token.expires_in);
        let access = token.access_token.clone();
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });
        Ok(access)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let token = self.access_token().await?;
        req.bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn read_document(&self, resp: reqwest::Response) -> Result<Document, StoreError> {
        let doc: FirestoreDocument = resp
            .json()
            .await
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        decode_document(doc)
    }

    async fn error_from(&self, resp: reqwest::Response) -> StoreError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        StoreError::Upstream { status, body }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        let resp = self.send(self.http.get(&url)).await?;
        match resp.status().as_u16() {
            404 => Ok(None),
            s if (200..300).contains(&s) => Ok(Some(self.read_document(resp).await?)),
            _ => Err(self.error_from(resp).await),
        }
    }

    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let url = format!("{}/{}", self.base_url, collection);
        let body = json!({ "fields": encode_fields(&fields) });
        let resp = self.send(self.http.post(&url).json(&body)).await?;
        if !resp.status().is_success() {
            return Err(self.error_from(resp).await);
        }
        self.read_document(resp).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        let body = json!({ "fields": encode_fields(&fields) });
        let resp = self.send(self.http.patch(&url).json(&body)).await?;
        if !resp.status().is_success() {
            return Err(self.error_from(resp).await);
        }
        self.read_document(resp).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        // Field mask restricts the write to the supplied fields; the exists
        // precondition turns a missing target into a NotFound.
        let mask: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.clone()))
            .collect();
        let body = json!({ "fields": encode_fields(&fields) });
        let resp = self
            .send(
                self.http
                    .patch(&url)
                    .query(&mask)
                    .query(&[("currentDocument.exists", "true")])
                    .json(&body),
            )
            .await?;
        match resp.status().as_u16() {
            404 | 409 => Err(StoreError::not_found(collection, id)),
            s if (200..300).contains(&s) => self.read_document(resp).await,
            _ => Err(self.error_from(resp).await),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        let resp = self
            .send(
                self.http
                    .delete(&url)
                    .query(&[("currentDocument.exists", "true")]),
            )
            .await?;
        match resp.status().as_u16() {
            404 | 409 => Err(StoreError::not_found(collection, id)),
            s if (200..300).contains(&s) => Ok(()),
            _ => Err(self.error_from(resp).await),
        }
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
        order_by: Option<(&str, Order)>,
    ) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.base_url);

        let mut structured = json!({
            "from": [{ "collectionId": collection }]
        });

        let mut field_filters: Vec<Value> = filters
            .iter()
            .map(|(field, value)| {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": encode_value(value)
                    }
                })
            })
            .collect();
        match field_filters.len() {
            0 => {}
            1 => structured["where"] = field_filters.remove(0),
            _ => {
                structured["where"] = json!({
                    "compositeFilter": { "op": "AND", "filters": field_filters }
                });
            }
        }

        if let Some((field, order)) = order_by {
            let direction = match order {
                Order::Asc => "ASCENDING",
                Order::Desc => "DESCENDING",
            };
            structured["orderBy"] = json!([
                { "field": { "fieldPath": field }, "direction": direction }
            ]);
        }

        let body = json!({ "structuredQuery": structured });
        let resp = self.send(self.http.post(&url).json(&body)).await?;
        if !resp.status().is_success() {
            return Err(self.error_from(resp).await);
        }

        #[derive(Deserialize)]
        struct QueryRow {
            document: Option<FirestoreDocument>,
        }

        let rows: Vec<QueryRow> = resp
            .json()
            .await
            .map_err(|e| StoreError::Codec(e.to_string()))?;

        rows.into_iter()
            .filter_map(|row| row.document)
            .map(decode_document)
            .collect()
    }
}

fn decode_document(doc: FirestoreDocument) -> Result<Document, StoreError> {
    let id = doc
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let mut fields = Map::new();
    for (k, v) in doc.fields {
        fields.insert(k, decode_value(&v)?);
    }
    Ok(Document { id, fields })
}

/// Encode a JSON field map into Firestore typed values.
fn encode_fields(fields: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (k, v) in fields {
        out.insert(k.clone(), encode_value(v));
    }
    Value::Object(out)
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore carries 64-bit integers as strings
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Codec(format!("expected typed value, got {}", value)))?;

    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::Codec("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "stringValue" => Ok(inner.clone()),
        "timestampValue" => Ok(inner.clone()),
        "integerValue" => {
            let raw = inner
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| inner.to_string());
            let parsed: i64 = raw
                .parse()
                .map_err(|_| StoreError::Codec(format!("bad integerValue: {}", raw)))?;
            Ok(json!(parsed))
        }
        "doubleValue" => Ok(inner.clone()),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let decoded: Result<Vec<Value>, StoreError> = items.iter().map(decode_value).collect();
            Ok(Value::Array(decoded?))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let mut out = Map::new();
            for (k, v) in fields {
                out.insert(k, decode_value(&v)?);
            }
            Ok(Value::Object(out))
        }
        other => Err(StoreError::Codec(format!("unhandled value kind '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_review_shaped_fields() {
        let fields = serde_json::from_str::<Map<String, Value>>(
            r#"{
                "movie_id": "m1",
                "rating": 5,
                "sentiment_score": 0.4,
                "sentiment_label": null,
                "created_at": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let encoded = encode_fields(&fields);
        assert_eq!(encoded["movie_id"]["stringValue"], "m1");
        assert_eq!(encoded["rating"]["integerValue"], "5");
        assert_eq!(encoded["sentiment_score"]["doubleValue"], 0.4);
        assert!(encoded["sentiment_label"]["nullValue"].is_null());
    }

    #[test]
    fn decodes_typed_values_back_to_json() {
        let typed = json!({
            "integerValue": "5"
        });
        assert_eq!(decode_value(&typed).unwrap(), json!(5));

        let typed = json!({ "timestampValue": "2024-01-01T00:00:00Z" });
        assert_eq!(decode_value(&typed).unwrap(), json!("2024-01-01T00:00:00Z"));

        let typed = json!({
            "mapValue": { "fields": { "label": { "stringValue": "positive" } } }
        });
        assert_eq!(decode_value(&typed).unwrap(), json!({"label": "positive"}));
    }

    #[test]
    fn document_id_comes_from_resource_name() {
        let doc = FirestoreDocument {
            name: "projects/p/databases/(default)/documents/reviews/abc123".to_string(),
            fields: Map::new(),
        };
        let decoded = decode_document(doc).unwrap();
        assert_eq!(decoded.id, "abc123");
    }
}
