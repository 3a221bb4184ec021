use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// HTTP header name carrying the shared API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Authentication middleware that validates the shared API key
///
/// This middleware:
/// - Checks for the X-API-Key header
/// - Compares its value against the configured API key, exact match
/// - Returns 401 Unauthorized for invalid/missing keys
/// - Allows requests to proceed if authentication is disabled in config
///
/// The middleware should be applied selectively to routes that require authentication.
/// Public endpoints (like /health) should not have this middleware applied.
pub async fn auth_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    // Extract the API key header
    let provided_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    // Get the API key from request extensions (injected by the router)
    let api_key = request
        .extensions()
        .get::<ApiKey>()
        .ok_or(AuthError::ConfigurationError)?;

    // If authentication is disabled, allow the request
    if !api_key.enabled {
        return Ok(next.run(request).await);
    }

    let provided_key = provided_key.ok_or(AuthError::MissingKey)?;

    // Validate the key
    if provided_key != api_key.key {
        return Err(AuthError::InvalidKey);
    }

    // Key is valid, proceed with the request
    Ok(next.run(request).await)
}

/// Extension type for storing API key configuration in request extensions
#[derive(Clone, Debug)]
pub struct ApiKey {
    pub enabled: bool,
    pub key: String,
}

impl ApiKey {
    /// Create a new ApiKey configuration
    pub fn new(enabled: bool, key: String) -> Self {
        Self { enabled, key }
    }
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    /// No X-API-Key header present
    MissingKey,
    /// Key does not match the configured API key
    InvalidKey,
    /// Authentication configuration not found
    ConfigurationError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::MissingKey => (
                StatusCode::UNAUTHORIZED,
                "Missing X-API-Key header",
            ),
            AuthError::InvalidKey => (
                StatusCode::UNAUTHORIZED,
                "Invalid API key",
            ),
            AuthError::ConfigurationError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication configuration error",
            ),
        };

        let body = Json(json!({
            "error": "AuthenticationError",
            "message": error_message,
        }));

        (status, body).into_response()
    }
}
