use crate::core::error::Result;
use axum::{extract::State, response::IntoResponse, Json};
use bson::doc;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: DatabaseHealth,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler for GET / - API welcome message
pub async fn welcome() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the Mongo Client API!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint
///
/// Probes the storage backend with a cheap read so an unreachable deployment
/// shows up as degraded rather than healthy-but-broken.
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let database = match state.store.find_one("_health", doc! {}).await {
        Ok(_) => DatabaseHealth {
            status: "healthy",
            message: None,
        },
        Err(err) => DatabaseHealth {
            status: "unhealthy",
            message: Some(err.to_string()),
        },
    };

    let status = if database.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    }))
}
