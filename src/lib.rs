//! Mongo REST Gateway Library
//!
//! This library provides a generic REST facade over MongoDB, including
//! Extended JSON normalization, dynamic per-collection CRUD routes, and
//! the supporting HTTP server.

pub mod api;
pub mod core;
pub mod db;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::Config;
pub use db::{DocumentStore, MemoryStore, MongoStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for the library
pub type Result<T> = anyhow::Result<T>;
