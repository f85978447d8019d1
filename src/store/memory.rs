//! In-process document store used by the test suite and by
//! `DOCUMENT_STORE=memory` development runs. Same observable semantics as
//! the Firestore client: auto ids, merge updates, NotFound on missing
//! update/delete targets.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Document, DocumentStore, Order, StoreError};

type Collection = HashMap<String, Map<String, Value>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(collection).and_then(|c| c.get(id)).map(|fields| Document {
            id: id.to_string(),
            fields: fields.clone(),
        }))
    }

    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut guard = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields.clone());
        Ok(Document { id, fields })
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields.clone());
        Ok(Document {
            id: id.to_string(),
            fields,
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let mut guard = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let existing = guard
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        for (k, v) in fields {
            existing.insert(k, v);
        }
        Ok(Document {
            id: id.to_string(),
            fields: existing.clone(),
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let removed = guard.get_mut(collection).and_then(|c| c.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
        order_by: Option<(&str, Order)>,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        let mut docs: Vec<Document> = guard
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, fields)| {
                        filters
                            .iter()
                            .all(|(field, expected)| fields.get(*field) == Some(expected))
                    })
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, order)) = order_by {
            docs.sort_by(|a, b| {
                let cmp = compare_values(a.fields.get(field), b.fields.get(field));
                match order {
                    Order::Asc => cmp,
                    Order::Desc => cmp.reverse(),
                }
            });
        }

        Ok(docs)
    }
}

/// Loose ordering over JSON values: strings lexicographically (RFC3339
/// timestamps sort chronologically this way), numbers numerically, absent
/// values first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryStore::new();
        let doc = store
            .create("reviews", fields(json!({"rating": 5})))
            .await
            .unwrap();
        let fetched = store.get("reviews", &doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.fields["rating"], json!(5));
    }

    #[tokio::test]
    async fn update_merges_and_missing_update_fails() {
        let store = MemoryStore::new();
        let doc = store
            .create("reviews", fields(json!({"rating": 3, "body": "ok"})))
            .await
            .unwrap();

        let updated = store
            .update("reviews", &doc.id, fields(json!({"rating": 4})))
            .await
            .unwrap();
        assert_eq!(updated.fields["rating"], json!(4));
        assert_eq!(updated.fields["body"], json!("ok"));

        let err = store
            .update("reviews", "missing", fields(json!({"rating": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_not_silently_idempotent() {
        let store = MemoryStore::new();
        let doc = store.create("reviews", Map::new()).await.unwrap();
        store.delete("reviews", &doc.id).await.unwrap();
        let err = store.delete("reviews", &doc.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryStore::new();
        for (movie, ts) in [("m1", "2024-01-02T00:00:00Z"), ("m2", "2024-01-01T00:00:00Z"), ("m1", "2024-01-03T00:00:00Z")] {
            store
                .create(
                    "reviews",
                    fields(json!({"movie_id": movie, "created_at": ts})),
                )
                .await
                .unwrap();
        }

        let docs = store
            .query(
                "reviews",
                &[("movie_id", json!("m1"))],
                Some(("created_at", Order::Desc)),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].fields["created_at"], json!("2024-01-03T00:00:00Z"));
    }
}
