//! In-memory storage implementation for testing
//!
//! Collections are plain vectors behind an async lock. Filter support covers
//! what the gateway actually issues: the empty filter, field equality, and
//! `$in` lists. Updates understand the `$set` operator only.

use crate::core::error::Result;
use crate::db::store::DocumentStore;
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory implementation of [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

/// Assign a fresh ObjectId `_id` when the document does not bring its own,
/// mirroring what the MongoDB server does on insert.
fn ensure_id(document: &mut Document) -> Bson {
    match document.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert("_id", id.clone());
            id
        }
    }
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| {
        let actual = document.get(key);
        match expected {
            Bson::Document(operators) if operators.len() == 1 => {
                if let Some(Bson::Array(candidates)) = operators.get("$in") {
                    return actual.is_some_and(|value| candidates.contains(value));
                }
                actual == Some(expected)
            }
            _ => actual == Some(expected),
        }
    })
}

fn apply_update(document: &mut Document, update: &Document) {
    if let Some(Bson::Document(fields)) = update.get("$set") {
        for (key, value) in fields {
            document.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson> {
        let id = ensure_id(&mut document);
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().push(document);
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<Bson>> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            ids.push(ensure_id(&mut document));
            stored.push(document);
        }
        Ok(ids)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|documents| {
            documents
                .iter()
                .find(|document| matches_filter(document, &filter))
                .cloned()
        }))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let mut matched: Vec<Document> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| matches_filter(document, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if limit > 0 && matched.len() > limit as usize {
            matched.truncate(limit as usize);
        }
        Ok(matched)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        match documents
            .iter_mut()
            .find(|document| matches_filter(document, &filter))
        {
            Some(document) => {
                apply_update(document, &update);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        match documents
            .iter()
            .position(|document| matches_filter(document, &filter))
        {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn close(&self) {}
}
