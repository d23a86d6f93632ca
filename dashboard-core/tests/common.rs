#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashboard_core::{
    CARDS, DashboardModel, DashboardViewModel, Document, DocumentStore, FieldFilter,
    InMemoryStore, StoreError, THREADS, USERS,
};
use serde_json::json;

/// Creates a store with the given users (email, name, score), threads and decks
pub async fn seeded_store(
    users: &[(&str, &str, u32)],
    threads: &[&str],
    decks: &[&str],
) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();

    for (index, (email, name, score)) in users.iter().enumerate() {
        store
            .insert(
                USERS,
                Document::new(
                    format!("user-{}", index),
                    json!({ "email": email, "name": name, "score": score }),
                ),
            )
            .await;
    }
    for thread in threads {
        store.insert(THREADS, Document::new(*thread, json!({}))).await;
    }
    for deck in decks {
        store
            .insert(CARDS, Document::new(*deck, json!({ "cards": [] })))
            .await;
    }

    Arc::new(store)
}

/// The two-user collection used across scenarios
pub async fn scenario_store() -> Arc<InMemoryStore> {
    seeded_store(
        &[("a@x.com", "Alice", 10), ("b@x.com", "Bob", 25)],
        &["graphs", "recursion"],
        &["big-o"],
    )
    .await
}

/// Wraps a store and fails every query against the listed collections
pub struct FailingStore {
    inner: Arc<InMemoryStore>,
    failing: Vec<&'static str>,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemoryStore>, failing: Vec<&'static str>) -> Self {
        Self { inner, failing }
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn query(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, StoreError> {
        if self.failing.contains(&collection) {
            return Err(StoreError::Unavailable("network is down".to_string()));
        }
        self.inner.query(collection, filter).await
    }
}

/// A store whose queries never complete
pub struct HangingStore;

#[async_trait]
impl DocumentStore for HangingStore {
    async fn query(
        &self,
        _collection: &str,
        _filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, StoreError> {
        std::future::pending().await
    }
}

/// Waits until the model satisfies `predicate`, panicking after two seconds
pub async fn wait_for_model<F>(view_model: &DashboardViewModel, mut predicate: F) -> DashboardModel
where
    F: FnMut(&DashboardModel) -> bool,
{
    let mut receiver = view_model.watch();
    let model = tokio::time::timeout(Duration::from_secs(2), receiver.wait_for(|m| predicate(m)))
        .await
        .expect("Timed out waiting for dashboard model")
        .expect("Dashboard model channel closed");
    model.clone()
}
