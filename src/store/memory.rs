//! In-memory document store.
//!
//! Documents are kept per collection in insertion order, so unordered reads
//! return them in the order they were written. Collections can be marked as
//! denied to reproduce the permission failures of a locked-down backend.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Direction, Document, DocumentStore, Query, StoreError, compare_values};

const DENY_ALL: &str = "*";
const DENIED_MESSAGE: &str = "Missing or insufficient permissions.";

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Document>>,
    denied: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `collection` fail with a permission error.
    pub async fn deny(&self, collection: &str) {
        self.inner.write().await.denied.insert(collection.to_owned());
    }

    /// Make every operation on every collection fail with a permission error.
    pub async fn deny_all(&self) {
        self.deny(DENY_ALL).await;
    }

    /// Lift all permission denials.
    pub async fn allow_all(&self) {
        self.inner.write().await.denied.clear();
    }

    /// Number of documents currently stored in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }
}

impl Inner {
    fn check(&self, collection: &str) -> Result<(), StoreError> {
        if self.denied.contains(DENY_ALL) || self.denied.contains(collection) {
            return Err(StoreError::PermissionDenied(DENIED_MESSAGE.into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        inner.check(collection)?;

        let mut docs: Vec<Document> = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(&doc.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            // Stable sort: ties keep insertion order. Missing fields sort first.
            docs.sort_by(|a, b| {
                let ord = match (a.data.get(&order.field), b.data.get(&order.field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(std::cmp::Ordering::Equal),
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        inner.check(collection)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Map<String, Value>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check(collection)?;
        let docs = inner.collections.entry(collection.to_owned()).or_default();
        match docs.iter_mut().find(|doc| doc.id == id) {
            Some(existing) => existing.data = data,
            None => docs.push(Document::new(id, data)),
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check(collection)?;
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        doc.data.extend(patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check(collection)?;
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.retain(|doc| doc.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
