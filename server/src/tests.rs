use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use semstore_core::{EntryStore, MemoryStore, PRIMARY_EMBEDDING_DIM};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::build_app;
use crate::config::AppConfig;
use crate::state::AppState;
mod error_mapping;

fn test_config() -> AppConfig {
    AppConfig {
        bind: "127.0.0.1:0".parse().expect("socket addr must parse"),
        request_timeout_ms: 2_000,
        max_body_bytes: 1_048_576,
        max_concurrency: 256,
        max_search_limit: 100,
        log_json: false,
    }
}

fn test_state() -> AppState {
    test_state_with_store(Arc::new(MemoryStore::new()))
}

fn test_state_with_store(store: Arc<dyn EntryStore>) -> AppState {
    AppState::new(test_config(), store)
}

fn axis(direction: usize) -> Vec<f32> {
    let mut values = vec![0.0; PRIMARY_EMBEDDING_DIM];
    values[direction] = 1.0;
    values
}

fn entry_payload(title: &str, primary_embedding: Vec<f32>) -> Value {
    json!({
        "owner": "6f1c2a7e-3b4d-4c5e-9f10-1a2b3c4d5e6f",
        "content_type": "journal",
        "title": title,
        "content": "walked along the river",
        "primary_embedding": primary_embedding,
        "tags": ["outdoors"],
        "linked_entities": {
            "people": ["Sam"],
            "locations": ["river"],
            "events": [],
            "topics": ["walking"]
        }
    })
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request must build")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request must build")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body must be readable");
    serde_json::from_slice(&bytes).expect("response body must be valid json")
}

async fn create(app: &Router, body: &Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/entries", body))
        .await
        .expect("response expected");
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn entry_crud_flow_works() {
    let app = build_app(test_state());

    let created = create(&app, &entry_payload("river walk", axis(0))).await;
    let id = created["id"].as_str().expect("id must be a string").to_string();
    assert_eq!(created["title"], "river walk");
    assert_eq!(created["created_at"], created["updated_at"]);
    assert_eq!(created["search_metadata"]["boost_factor"], 1.0);
    assert_eq!(created["search_metadata"]["recency_weight"], 0.5);

    let get_resp = app
        .clone()
        .oneshot(empty_request("GET", &format!("/entries/{id}")))
        .await
        .expect("response expected");
    assert_eq!(get_resp.status(), StatusCode::OK);
    assert_eq!(json_body(get_resp).await, created);

    let mut replacement = entry_payload("evening walk", axis(1));
    replacement["created_at"] = json!("2001-01-01T00:00:00Z");
    let put_resp = app
        .clone()
        .oneshot(json_request("PUT", &format!("/entries/{id}"), &replacement))
        .await
        .expect("response expected");
    assert_eq!(put_resp.status(), StatusCode::OK);
    let replaced = json_body(put_resp).await;
    assert_eq!(replaced["id"], created["id"]);
    assert_eq!(replaced["title"], "evening walk");
    assert_eq!(replaced["created_at"], created["created_at"]);

    let delete_resp = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/entries/{id}")))
        .await
        .expect("response expected");
    assert_eq!(delete_resp.status(), StatusCode::OK);
    let deleted = json_body(delete_resp).await;
    assert_eq!(deleted["id"], created["id"]);
    assert_eq!(deleted["deleted"], true);

    let missing_resp = app
        .oneshot(empty_request("GET", &format!("/entries/{id}")))
        .await
        .expect("response expected");
    assert_eq!(missing_resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing_resp).await["code"], "not_found");
}

#[tokio::test]
async fn live_and_ready_report_status() {
    let app = build_app(test_state());
    create(&app, &entry_payload("river walk", axis(0))).await;

    let live_resp = app
        .clone()
        .oneshot(empty_request("GET", "/live"))
        .await
        .expect("response expected");
    assert_eq!(live_resp.status(), StatusCode::OK);
    assert_eq!(json_body(live_resp).await["status"], "live");

    let ready_resp = app
        .oneshot(empty_request("GET", "/ready"))
        .await
        .expect("response expected");
    assert_eq!(ready_resp.status(), StatusCode::OK);
    let ready = json_body(ready_resp).await;
    assert_eq!(ready["status"], "ready");
    assert_eq!(ready["entry_count"], 1);
    assert_eq!(ready["checks"]["storage_available"], true);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = build_app(test_state());
    let response = app
        .oneshot(empty_request("GET", "/live"))
        .await
        .expect("response expected");
    assert!(response.headers().contains_key("x-request-id"));
}
