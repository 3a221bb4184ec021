//! API routes

use crate::api::handlers::{
    create_documents, delete_document, get_document, health_check, list_documents,
    update_document, welcome, AppState,
};
use crate::api::middleware::auth::{auth_middleware, ApiKey};
use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::get,
    Router,
};

/// Build the API routes
///
/// System routes (welcome, health) are public and always live at the server
/// root. Collection routes carry the API key gate and are nested under
/// `path_prefix` when one is configured.
pub fn build_api_routes(state: AppState, api_key: ApiKey, path_prefix: &str) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check));

    // Collection gateway routes. Both spellings of the collection path are
    // registered; there is no redirect between them. Static routes win over
    // the :collection parameter, so without a path prefix a collection named
    // "health" is unreachable.
    let collection_routes = Router::new()
        .route("/:collection", get(list_documents).post(create_documents))
        .route("/:collection/", get(list_documents).post(create_documents))
        .route(
            "/:collection/:id",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .layer(middleware::from_fn(move |mut req: Request, next: Next| {
            let api_key = api_key.clone();
            async move {
                // Inject API key into request extensions
                req.extensions_mut().insert(api_key);
                // Call auth middleware
                auth_middleware(req, next).await
            }
        }));

    let collection_routes = if path_prefix.is_empty() {
        collection_routes
    } else {
        Router::new().nest(path_prefix, collection_routes)
    };

    // Combine public and collection routes
    public_routes.merge(collection_routes).with_state(state)
}
