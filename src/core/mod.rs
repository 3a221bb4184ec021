//! Core application module
//!
//! This module provides the core application layer including:
//! - Extended JSON normalization and wire projection
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system
//! - Secret resolution from the deployment environment

pub mod config;
pub mod ejson;
pub mod error;
pub mod logging;
pub mod secrets;

pub use config::Config;
pub use error::{ApiError, ErrorResponse, Result};
pub use logging::Logger;
