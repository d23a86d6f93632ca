use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

pub const USERS: &str = "users";
pub const THREADS: &str = "threads";
pub const CARDS: &str = "cards";

/// A schemaless document: an identifier plus a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Equality filter on a single top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.field(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
    #[error("Document store query failed: {0}")]
    Backend(String),
    #[error("Corrupt document {collection}/{id}: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },
}

/// Read access to a collection-oriented document database.
///
/// Results come back in the store's own order; callers must not assume any
/// sorting beyond that.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, StoreError>;
}

/// Insertion-ordered store kept entirely in memory.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, replacing any existing one with the same id in place.
    pub async fn insert(&self, collection: &str, document: Document) {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        match documents.iter_mut().find(|doc| doc.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
    }

    pub async fn remove(&self, collection: &str, id: &str) -> bool {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection) {
            Some(documents) => {
                let before = documents.len();
                documents.retain(|doc| doc.id != id);
                documents.len() != before
            }
            None => false,
        }
    }

    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn query(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let documents = match collections.get(collection) {
            Some(documents) => documents,
            None => return Ok(Vec::new()),
        };

        Ok(documents
            .iter()
            .filter(|doc| filter.is_none_or(|f| f.matches(doc)))
            .cloned()
            .collect())
    }
}
