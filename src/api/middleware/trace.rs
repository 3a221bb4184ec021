use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// HTTP header name for trace ID
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Middleware that assigns a trace ID to each request and propagates it
/// through the request lifecycle.
///
/// The trace ID is:
/// - Taken from an incoming X-Trace-Id header when an upstream proxy set one,
///   otherwise generated as a UUID v4
/// - Added to the request extensions for access by handlers
/// - Included in all log entries via the request span
/// - Echoed back in the response headers
pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = incoming_trace_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    request.extensions_mut().insert(TraceId(trace_id.clone()));

    let started = Instant::now();
    let mut response = async move {
        tracing::info!("Request started");
        let response = next.run(request).await;
        tracing::info!(
            status = %response.status(),
            elapsed_ms = %started.elapsed().as_millis(),
            "Request completed"
        );
        response
    }
    .instrument(span)
    .await;

    response.headers_mut().insert(
        TRACE_ID_HEADER,
        HeaderValue::from_str(&trace_id).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    response
}

/// A syntactically sane trace ID supplied by the caller. Anything longer than
/// 128 characters or containing non-visible-ASCII is ignored.
fn incoming_trace_id(request: &Request) -> Option<String> {
    let value = request.headers().get(TRACE_ID_HEADER)?.to_str().ok()?;
    if value.is_empty() || value.len() > 128 {
        return None;
    }
    Some(value.to_string())
}

/// Extension type for storing trace ID in request extensions
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Get the trace ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
