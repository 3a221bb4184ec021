//! Storage abstraction for collection-level document access
//!
//! Handlers talk to a [`DocumentStore`] rather than the MongoDB driver
//! directly, so the HTTP layer can run against the in-memory backend in
//! tests.

use crate::core::error::Result;
use async_trait::async_trait;
use bson::{Bson, Document};

/// Backend-neutral document operations on dynamically named collections.
///
/// Collections are addressed by name on every call; backends create them
/// implicitly on first write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a single document, returning its `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson>;

    /// Insert a batch of documents, returning their `_id`s in input order.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<Bson>>;

    /// Find the first document matching the filter.
    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

    /// Find documents matching the filter, up to `limit` (0 means no limit).
    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        limit: i64,
    ) -> Result<Vec<Document>>;

    /// Apply an update to the first document matching the filter, returning
    /// the matched count.
    async fn update_one(&self, collection: &str, filter: Document, update: Document)
        -> Result<u64>;

    /// Delete the first document matching the filter, returning the deleted
    /// count.
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Release backend resources. Called once during shutdown.
    async fn close(&self);
}
