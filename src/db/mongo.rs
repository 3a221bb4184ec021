//! MongoDB storage implementation
//!
//! Thin adapter from [`DocumentStore`] onto the official driver. The driver
//! multiplexes its own connection pool behind the cloned `Client` handle, so
//! one store instance serves all request tasks.

use crate::core::config::DatabaseConfig;
use crate::core::error::Result;
use crate::db::store::DocumentStore;
use anyhow::Context;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database};

/// MongoDB-backed implementation of [`DocumentStore`].
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect to the configured deployment and select the target database.
    ///
    /// The database comes from the explicit `name` override when present,
    /// otherwise from the path segment of the connection string. The initial
    /// ping makes startup fail fast on an unreachable deployment.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(&config.url)
            .await
            .context("Failed to create MongoDB client")?;

        let database = match &config.name {
            Some(name) => client.database(name),
            None => client.default_database().context(
                "No database configured: set database.name or put one in the connection string",
            )?,
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to reach MongoDB deployment")?;

        tracing::info!(database = %database.name(), "Connected to MongoDB");

        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<Vec<Bson>> {
        let result = self.collection(collection).insert_many(documents).await?;

        // The driver reports ids keyed by input index.
        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let cursor = self.collection(collection).find(filter).limit(limit).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<u64> {
        let result = self
            .collection(collection)
            .update_one(filter, update)
            .await?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn close(&self) {
        // Consuming shutdown on a clone tears down the shared topology.
        self.client.clone().shutdown().await;
    }
}
