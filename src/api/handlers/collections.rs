//! Dynamic collection gateway
//!
//! One set of handlers serves every collection; the collection name is taken
//! verbatim from the path segment and collections come into existence on
//! first write. Write payloads pass through Extended JSON normalization,
//! responses are projected back to wire-safe JSON with `_id` as a string.

use crate::core::ejson::{document_to_wire, id_filter, id_to_string, json_to_bson, normalize};
use crate::core::error::{ApiError, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bson::{doc, Bson, Document};
use serde_json::Value;

use super::AppState;

/// Upper bound on documents returned by a collection listing.
pub const MAX_LIST_DOCUMENTS: i64 = 1000;

/// Handler for POST /:collection/ - Create document(s)
///
/// Accepts a single JSON object or a non-empty array of objects. Inserted
/// documents are re-fetched so the response reflects what the backend
/// actually stored, including generated `_id`s.
pub async fn create_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    match payload {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(ApiError::EmptyBatch);
            }

            let documents = items
                .into_iter()
                .map(normalize_object)
                .collect::<Result<Vec<Document>>>()?;

            let ids = state.store.insert_many(&collection, documents).await?;
            let fetch_limit = ids.len() as i64;
            let created = state
                .store
                .find_many(&collection, doc! { "_id": { "$in": ids } }, fetch_limit)
                .await?;

            let body: Vec<Value> = created.into_iter().map(document_to_wire).collect();
            Ok((StatusCode::CREATED, Json(Value::Array(body))))
        }
        value => {
            let document = normalize_object(value)?;
            let id = state.store.insert_one(&collection, document).await?;
            let created = state
                .store
                .find_one(&collection, doc! { "_id": id.clone() })
                .await?
                .ok_or_else(|| ApiError::not_found(&collection, &id_to_string(&id)))?;

            Ok((StatusCode::CREATED, Json(document_to_wire(created))))
        }
    }
}

/// Handler for GET /:collection/ - List documents
pub async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Value>> {
    let documents = state
        .store
        .find_many(&collection, doc! {}, MAX_LIST_DOCUMENTS)
        .await?;

    let body: Vec<Value> = documents.into_iter().map(document_to_wire).collect();
    Ok(Json(Value::Array(body)))
}

/// Handler for GET /:collection/:id - Get a document by ID
pub async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let document = state
        .store
        .find_one(&collection, id_filter(&id))
        .await?
        .ok_or_else(|| ApiError::not_found(&collection, &id))?;

    Ok(Json(document_to_wire(document)))
}

/// Handler for PATCH /:collection/:id - Partially update a document
///
/// `_id` is stripped from the payload; an update left empty by the strip
/// skips the write and returns the current document. Update fields apply
/// verbatim, without sentinel rewriting.
pub async fn update_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>> {
    let Value::Object(mut fields) = payload else {
        return Err(ApiError::InvalidRequest(
            "update payload must be a JSON object".to_string(),
        ));
    };
    fields.remove("_id");

    let filter = id_filter(&id);

    if !fields.is_empty() {
        let mut update_fields = Document::new();
        for (key, value) in fields {
            update_fields.insert(key, json_to_bson(value));
        }

        let matched = state
            .store
            .update_one(&collection, filter.clone(), doc! { "$set": update_fields })
            .await?;
        if matched == 0 {
            return Err(ApiError::not_found(&collection, &id));
        }
    }

    let updated = state
        .store
        .find_one(&collection, filter)
        .await?
        .ok_or_else(|| ApiError::not_found(&collection, &id))?;

    Ok(Json(document_to_wire(updated)))
}

/// Handler for DELETE /:collection/:id - Delete a document
pub async fn delete_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let deleted = state
        .store
        .delete_one(&collection, id_filter(&id))
        .await?;

    if deleted == 1 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(&collection, &id))
    }
}

/// Normalize one payload entry, requiring it to be a JSON object. A payload
/// that normalizes to a non-document (a bare value, or a top-level sentinel
/// map) cannot be stored as a document.
fn normalize_object(value: Value) -> Result<Document> {
    match normalize(value) {
        Bson::Document(document) => Ok(document),
        _ => Err(ApiError::InvalidRequest(
            "document payload must be a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::auth::{ApiKey, API_KEY_HEADER};
    use crate::api::routes::build_api_routes;
    use crate::db::memory::MemoryStore;
    use crate::db::store::DocumentStore;
    use axum::{
        body::Body,
        http::{header, Request},
        Router,
    };
    use bson::oid::ObjectId;
    use serde_json::json;
    use std::sync::Arc;
    use tower::util::ServiceExt; // For oneshot method

    const SAMPLE_OID: &str = "507f1f77bcf86cd799439011";

    fn test_app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone());
        let app = build_api_routes(state, ApiKey::new(false, String::new()), "");
        (store, app)
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_single_document() {
        let (_, app) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/items/",
                &json!({ "name": "widget", "price": 12.5 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let created = body_json(response).await;
        assert!(created["_id"].is_string());
        assert_eq!(created["name"], "widget");
        assert_eq!(created["price"], 12.5);

        // Fetching by the returned id yields the same wire document.
        let id = created["_id"].as_str().unwrap();
        let fetched = app
            .oneshot(empty_request("GET", &format!("/items/{id}")))
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(body_json(fetched).await, created);
    }

    #[tokio::test]
    async fn test_create_accepts_both_path_spellings() {
        let (_, app) = test_app();

        let with_slash = app
            .clone()
            .oneshot(json_request("POST", "/items/", &json!({ "n": 1 })))
            .await
            .unwrap();
        assert_eq!(with_slash.status(), StatusCode::CREATED);

        let without_slash = app
            .oneshot(json_request("POST", "/items", &json!({ "n": 2 })))
            .await
            .unwrap();
        assert_eq!(without_slash.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_create_with_oid_sentinel_id() {
        let (_, app) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/items/",
                &json!({ "_id": { "$oid": SAMPLE_OID }, "n": 1 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["_id"], SAMPLE_OID);

        // The hex spelling resolves back to the native ObjectId.
        let fetched = app
            .oneshot(empty_request("GET", &format!("/items/{SAMPLE_OID}")))
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        let body = body_json(fetched).await;
        assert_eq!(body["n"], 1);
    }

    #[tokio::test]
    async fn test_create_with_date_sentinel() {
        let (store, app) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/events/",
                &json!({ "at": { "$date": { "$numberLong": "1704067200000" } } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["at"], "2024-01-01T00:00:00Z");

        // Stored natively, not as a sentinel map.
        let stored = store.find_one("events", doc! {}).await.unwrap().unwrap();
        assert!(matches!(stored.get("at"), Some(Bson::DateTime(_))));
    }

    #[tokio::test]
    async fn test_create_batch() {
        let (_, app) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/items/",
                &json!([{ "n": 1 }, { "n": 2 }, { "n": 3 }]),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let created = body.as_array().unwrap();
        assert_eq!(created.len(), 3);
        for document in created {
            assert!(document["_id"].is_string());
        }
    }

    #[tokio::test]
    async fn test_create_empty_batch_is_rejected() {
        let (_, app) = test_app();

        let response = app
            .oneshot(json_request("POST", "/items/", &json!([])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "EmptyBatch");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_payloads() {
        let (_, app) = test_app();

        let scalar = app
            .clone()
            .oneshot(json_request("POST", "/items/", &json!(42)))
            .await
            .unwrap();
        assert_eq!(scalar.status(), StatusCode::BAD_REQUEST);

        let mixed_batch = app
            .oneshot(json_request("POST", "/items/", &json!([{ "n": 1 }, "stray"])))
            .await
            .unwrap();
        assert_eq!(mixed_batch.status(), StatusCode::BAD_REQUEST);
        let body = body_json(mixed_batch).await;
        assert_eq!(body["error"], "InvalidRequest");
    }

    #[tokio::test]
    async fn test_list_documents() {
        let (store, app) = test_app();
        store
            .insert_many(
                "items",
                vec![doc! { "n": 1 }, doc! { "n": 2 }, doc! { "n": 3 }],
            )
            .await
            .unwrap();

        let response = app
            .oneshot(empty_request("GET", "/items/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|document| document["_id"].is_string()));
    }

    #[tokio::test]
    async fn test_list_unknown_collection_is_empty() {
        let (_, app) = test_app();

        let response = app
            .oneshot(empty_request("GET", "/nothing-here/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_list_is_capped() {
        let (store, app) = test_app();
        let documents: Vec<Document> = (0..1500).map(|n| doc! { "n": n }).collect();
        store.insert_many("items", documents).await.unwrap();

        let response = app
            .oneshot(empty_request("GET", "/items/"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), MAX_LIST_DOCUMENTS as usize);
    }

    #[tokio::test]
    async fn test_get_by_string_id() {
        let (store, app) = test_app();
        store
            .insert_one("users", doc! { "_id": "user-1", "name": "ada" })
            .await
            .unwrap();

        let response = app
            .oneshot(empty_request("GET", "/users/user-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["_id"], "user-1");
        assert_eq!(body["name"], "ada");
    }

    #[tokio::test]
    async fn test_get_missing_document_is_404() {
        let (store, app) = test_app();
        store
            .insert_one("users", doc! { "_id": "present", "n": 1 })
            .await
            .unwrap();

        let response = app
            .oneshot(empty_request("GET", "/users/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "NotFound");
        assert_eq!(body["collection"], "users");
        assert_eq!(body["id"], "missing");
    }

    #[tokio::test]
    async fn test_hex_string_id_resolves_as_object_id_only() {
        let (store, app) = test_app();
        // A document whose *string* _id happens to be 24 hex characters.
        store
            .insert_one("items", doc! { "_id": SAMPLE_OID, "n": 1 })
            .await
            .unwrap();

        // The path id parses as an ObjectId, so the string document is
        // unreachable under that spelling.
        let response = app
            .oneshot(empty_request("GET", &format!("/items/{SAMPLE_OID}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_document() {
        let (store, app) = test_app();
        let id = store
            .insert_one("items", doc! { "n": 1, "keep": "yes" })
            .await
            .unwrap();
        let hex = match &id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => panic!("unexpected id {other:?}"),
        };

        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/items/{hex}"),
                &json!({ "n": 2, "_id": "should-be-ignored" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["_id"], hex);
        assert_eq!(body["n"], 2);
        assert_eq!(body["keep"], "yes");
    }

    #[tokio::test]
    async fn test_update_empty_payload_returns_current_document() {
        let (store, app) = test_app();
        store
            .insert_one("items", doc! { "_id": "k", "n": 1 })
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request("PATCH", "/items/k", &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body, json!({ "_id": "k", "n": 1 }));

        // A body that is empty after the _id strip is the same no-op.
        let response = app
            .oneshot(json_request(
                "PATCH",
                "/items/k",
                &json!({ "_id": "other" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "_id": "k", "n": 1 }));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_404() {
        let (_, app) = test_app();

        let with_fields = app
            .clone()
            .oneshot(json_request("PATCH", "/items/missing", &json!({ "n": 1 })))
            .await
            .unwrap();
        assert_eq!(with_fields.status(), StatusCode::NOT_FOUND);

        // The no-op path 404s on the re-fetch instead of the write.
        let no_op = app
            .oneshot(json_request("PATCH", "/items/missing", &json!({})))
            .await
            .unwrap();
        assert_eq!(no_op.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_applies_fields_verbatim() {
        let (store, app) = test_app();
        store
            .insert_one("items", doc! { "_id": "k", "n": 1 })
            .await
            .unwrap();

        // Sentinel maps in a patch stay literal maps.
        let response = app
            .oneshot(json_request(
                "PATCH",
                "/items/k",
                &json!({ "ref": { "$oid": SAMPLE_OID } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ref"], json!({ "$oid": SAMPLE_OID }));

        let stored = store
            .find_one("items", doc! { "_id": "k" })
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(stored.get("ref"), Some(Bson::Document(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_non_object_payload() {
        let (_, app) = test_app();

        let response = app
            .oneshot(json_request("PATCH", "/items/k", &json!([1, 2])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_document() {
        let (store, app) = test_app();
        store
            .insert_one("items", doc! { "_id": "k", "n": 1 })
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", "/items/k"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());

        let again = app
            .oneshot(empty_request("DELETE", "/items/k"))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_by_object_id() {
        let (store, app) = test_app();
        let oid = ObjectId::new();
        store
            .insert_one("items", doc! { "_id": oid, "n": 1 })
            .await
            .unwrap();

        let response = app
            .oneshot(empty_request("DELETE", &format!("/items/{}", oid.to_hex())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.is_empty("items").await);
    }

    #[tokio::test]
    async fn test_collection_routes_require_api_key_when_enabled() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store);
        let app = build_api_routes(state, ApiKey::new(true, "secret".to_string()), "");

        let denied = app
            .clone()
            .oneshot(empty_request("GET", "/items/"))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/items/")
                    .header(API_KEY_HEADER, "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);

        // System routes stay public.
        let health = app
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_path_prefix_nests_collection_routes() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store);
        let app = build_api_routes(state, ApiKey::new(false, String::new()), "/api");

        let nested = app
            .clone()
            .oneshot(empty_request("GET", "/api/items/"))
            .await
            .unwrap();
        assert_eq!(nested.status(), StatusCode::OK);

        // The bare path no longer serves collections.
        let bare = app
            .clone()
            .oneshot(empty_request("GET", "/items/"))
            .await
            .unwrap();
        assert_eq!(bare.status(), StatusCode::NOT_FOUND);

        // System routes stay at the root.
        let health = app
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_welcome_and_health() {
        let (_, app) = test_app();

        let welcome = app
            .clone()
            .oneshot(empty_request("GET", "/"))
            .await
            .unwrap();
        assert_eq!(welcome.status(), StatusCode::OK);
        let body = body_json(welcome).await;
        assert_eq!(body["message"], "Welcome to the Mongo Client API!");

        let health = app
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        let body = body_json(health).await;
        assert_eq!(body["status"], "healthy");
    }
}
