//! REST API module
//!
//! This module provides the HTTP server and REST API endpoints including:
//! - Dynamic collection routing and request handling
//! - API key authentication middleware
//! - Error handling and response formatting

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
pub use server::ApiServer;
