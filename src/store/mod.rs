//! Document store contract.
//!
//! Collections of schemaless JSON documents with per-document atomicity.
//! Backed by Firestore in deployment and by an in-process map for tests and
//! credential-less development.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// A stored document: opaque identifier plus its JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("store transport error: {0}")]
    Transport(String),

    #[error("store returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("document codec error: {0}")]
    Codec(String),

    #[error("credential error: {0}")]
    Credentials(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. `Ok(None)` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document with a store-generated id.
    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    /// Create or fully replace a document at a caller-chosen id.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    /// Merge the given fields into an existing document. Fails with
    /// `NotFound` when the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    /// Delete a document. Fails with `NotFound` when the document does not
    /// exist, so repeat deletes surface as 404s rather than silent no-ops.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Equality-filtered scan of a collection, optionally ordered by one
    /// field. No pagination cap; callers own any limiting.
    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
        order_by: Option<(&str, Order)>,
    ) -> Result<Vec<Document>, StoreError>;
}
