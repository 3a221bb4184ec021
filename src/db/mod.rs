//! Database module
//!
//! This module provides document storage functionality including:
//! - The backend-neutral `DocumentStore` trait
//! - The MongoDB-backed production store
//! - An in-memory store for tests

pub mod memory;
pub mod mongo;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::DocumentStore;
