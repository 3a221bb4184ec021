//! Mongo REST Gateway
//!
//! A generic RESTful API over MongoDB with dynamic per-collection routes.

use mongo_rest::{api, core, db};

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let mut config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("Starting Mongo REST Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Secrets mounted by the deployment environment override file config
    core::secrets::apply(&mut config)?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        path_prefix = %config.server.path_prefix,
        "Server configuration"
    );
    info!(
        database = ?config.database.name,
        "Database configuration"
    );
    info!(
        auth_enabled = config.security.enable_auth,
        "Security configuration"
    );

    // Connect to MongoDB and verify the deployment responds
    info!("Connecting to MongoDB...");
    let store = std::sync::Arc::new(db::MongoStore::connect(&config.database).await?);
    info!("Database connection established");

    // Initialize API server
    info!("Initializing HTTP server...");
    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(&config, store);

    info!("Mongo REST Gateway initialized successfully");
    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}
