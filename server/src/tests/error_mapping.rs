use std::sync::Arc;

use axum::http::StatusCode;
use semstore_core::{Entry, EntryId, EntryStore, SearchFilter, StoreError};
use serde_json::json;
use tower::ServiceExt;

use super::{
    axis, create, empty_request, entry_payload, json_body, json_request, test_config,
    test_state, test_state_with_store,
};
use crate::build_app;
use crate::state::AppState;

struct OfflineStore;

impl EntryStore for OfflineStore {
    fn store(&self, _entry: Entry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn fetch_by_id(&self, _id: EntryId) -> Result<Entry, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn replace(&self, _id: EntryId, _entry: Entry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn delete_by_id(&self, _id: EntryId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn search_similar(
        &self,
        _vector: &[f32],
        _filter: &SearchFilter,
        _limit: usize,
    ) -> Result<Vec<(Entry, f32)>, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }
}

#[tokio::test]
async fn create_rejects_invalid_entry_with_every_violation() {
    let app = build_app(test_state());
    let mut body = entry_payload("", vec![0.5; 10]);
    body["tags"] = json!(["", "ok"]);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/entries", &body))
        .await
        .expect("response expected");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = json_body(response).await;
    assert_eq!(error["code"], "invalid_argument");
    let violations = error["violations"]
        .as_array()
        .expect("violations must be an array");
    let fields: Vec<&str> = violations
        .iter()
        .filter_map(|violation| violation["field"].as_str())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"primary_embedding"));
    assert!(fields.iter().any(|field| field.starts_with("tags")));

    let embedding = violations
        .iter()
        .find(|violation| violation["field"] == "primary_embedding")
        .expect("embedding violation must be reported");
    assert!(embedding["reason"]
        .as_str()
        .expect("reason must be a string")
        .contains("768"));

    let ready = app
        .oneshot(empty_request("GET", "/ready"))
        .await
        .expect("response expected");
    assert_eq!(json_body(ready).await["entry_count"], 0);
}

#[tokio::test]
async fn replace_with_sparse_payload_is_rejected() {
    let app = build_app(test_state());
    let created = create(&app, &entry_payload("river walk", axis(0))).await;
    let id = created["id"].as_str().expect("id must be a string");

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/entries/{id}"),
            &json!({"title": "only a title"}),
        ))
        .await
        .expect("response expected");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await;
    assert_eq!(error["code"], "invalid_argument");
    assert!(!error["violations"]
        .as_array()
        .expect("violations must be an array")
        .is_empty());
}

#[tokio::test]
async fn patch_is_not_implemented() {
    let app = build_app(test_state());
    let created = create(&app, &entry_payload("river walk", axis(0))).await;
    let id = created["id"].as_str().expect("id must be a string");

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/entries/{id}"),
            &json!({"title": "patched"}),
        ))
        .await
        .expect("response expected");
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json_body(response).await["code"], "not_implemented");

    let stored = app
        .oneshot(empty_request("GET", &format!("/entries/{id}")))
        .await
        .expect("response expected");
    assert_eq!(json_body(stored).await["title"], "river walk");
}

#[tokio::test]
async fn malformed_entry_id_is_rejected() {
    let app = build_app(test_state());
    for method in ["GET", "DELETE"] {
        let response = app
            .clone()
            .oneshot(empty_request(method, "/entries/not-a-uuid"))
            .await
            .expect("response expected");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "invalid_argument");
    }
}

#[tokio::test]
async fn unknown_entry_is_not_found() {
    let app = build_app(test_state());
    let id = uuid::Uuid::new_v4();

    let delete_resp = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/entries/{id}")))
        .await
        .expect("response expected");
    assert_eq!(delete_resp.status(), StatusCode::NOT_FOUND);

    let put_resp = app
        .oneshot(json_request(
            "PUT",
            &format!("/entries/{id}"),
            &entry_payload("river walk", axis(0)),
        ))
        .await
        .expect("response expected");
    assert_eq!(put_resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = build_app(test_state());
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/entries")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"title\": "))
        .expect("request must build");

    let response = app.oneshot(request).await.expect("response expected");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "invalid JSON payload");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = test_config();
    config.max_body_bytes = 256;
    let app = build_app(AppState::new(
        config,
        Arc::new(semstore_core::MemoryStore::new()),
    ));

    let response = app
        .oneshot(json_request(
            "POST",
            "/entries",
            &entry_payload("river walk", axis(0)),
        ))
        .await
        .expect("response expected");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn store_outage_maps_to_unavailable() {
    let app = build_app(test_state_with_store(Arc::new(OfflineStore)));

    let create_resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &entry_payload("river walk", axis(0)),
        ))
        .await
        .expect("response expected");
    assert_eq!(create_resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let error = json_body(create_resp).await;
    assert_eq!(error["code"], "unavailable");
    assert!(!error["message"]
        .as_str()
        .expect("message must be a string")
        .contains("backend offline"));

    let search_resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries/search",
            &json!({"query_embedding": axis(0)}),
        ))
        .await
        .expect("response expected");
    assert_eq!(search_resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let ready_resp = app
        .oneshot(empty_request("GET", "/ready"))
        .await
        .expect("response expected");
    assert_eq!(ready_resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
