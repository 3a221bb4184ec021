//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Configurable host/port binding
//! - Graceful shutdown handling
//! - CORS support
//! - Trace ID and request tracing middleware

use crate::api::handlers::AppState;
use crate::api::middleware::{trace_id_middleware, ApiKey};
use crate::api::routes::build_api_routes;
use crate::core::config::{Config, ServerConfig};
use crate::db::store::DocumentStore;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
    store: Arc<dyn DocumentStore>,
}

impl ApiServer {
    /// Create a new API server over the given document store
    pub fn new(config: &Config, store: Arc<dyn DocumentStore>) -> Self {
        let router = Self::build_router(config, store.clone());

        Self {
            router,
            config: config.server.clone(),
            store,
        }
    }

    /// Build the Axum router with all routes and middleware
    fn build_router(config: &Config, store: Arc<dyn DocumentStore>) -> Router {
        // Create API key configuration for authentication
        let api_key = ApiKey::new(
            config.security.enable_auth,
            config.security.api_key.clone(),
        );

        // Create application state
        let app_state = AppState::new(store);

        // Apply global middleware layers
        build_api_routes(app_state, api_key, &config.server.path_prefix).layer(
            ServiceBuilder::new()
                // Add trace ID middleware for request tracking
                .layer(middleware::from_fn(trace_id_middleware))
                // Add tracing for all requests
                .layer(TraceLayer::new_for_http())
                // Add CORS support
                .layer(Self::build_cors_layer(&config.security.allowed_origins)),
        )
    }

    /// Build CORS layer from allowed origins configuration
    fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
        use tower_http::cors::Any;

        let cors = CorsLayer::new();

        // If allowed_origins contains "*", allow any origin
        if allowed_origins.contains(&"*".to_string()) {
            cors.allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            // Parse allowed origins, skipping any that are not valid header values
            let origins: Vec<_> = allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Skipping unparseable allowed origin");
                        None
                    }
                })
                .collect();

            cors.allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully, then
    /// close the store handle.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            path_prefix = %self.config.path_prefix,
            "Starting HTTP server"
        );

        // Create TCP listener
        let listener = tokio::net::TcpListener::bind(socket_addr).await?;

        info!(addr = %socket_addr, "HTTP server listening");

        // Serve with graceful shutdown
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.store.close().await;

        info!("HTTP server shut down gracefully");

        Ok(())
    }

    /// Get a reference to the router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Initiating graceful shutdown...");
}
