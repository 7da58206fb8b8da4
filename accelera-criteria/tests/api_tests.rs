//! Integration tests for accelera-criteria API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Scoped and unscoped criteria lists
//! - Criterion creation (validation, notification, cache write-through)
//! - Lookup by id
//! - On-demand refresh from the feeds

use accelera_common::{CriteriaStore, ProgramId, RawCriterion};
use accelera_criteria::feeds::{CacheFeed, CriteriaFeed, MemoryFeed};
use accelera_criteria::sync::CriteriaSync;
use accelera_criteria::{build_router, db, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test harness: app state plus the in-memory feed driving it
struct TestApp {
    state: AppState,
    memory: MemoryFeed,
}

impl TestApp {
    async fn new() -> Self {
        let pool = db::connect_in_memory()
            .await
            .expect("Should open in-memory database");
        let cache = CacheFeed::new(pool);
        let memory = MemoryFeed::new();

        let store = Arc::new(CriteriaStore::new());
        let sync = CriteriaSync::new(store)
            .with_feed(Arc::new(cache.clone()))
            .with_feed(Arc::new(memory.clone()));

        Self {
            state: AppState::new(Arc::new(sync), cache),
            memory,
        }
    }

    fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Seed the in-memory feed and pull it into the store
    async fn seed(&self, records: Vec<Value>) {
        self.memory.extend(records.into_iter().map(raw));
        self.state.sync.refresh(None).await;
    }
}

fn raw(value: Value) -> RawCriterion {
    serde_json::from_value(value).expect("Should parse raw criterion")
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn ids(body: &Value) -> Vec<String> {
    body["criteria"]
        .as_array()
        .expect("criteria should be an array")
        .iter()
        .map(|c| c["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;

    let response = app.router().oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "accelera-criteria");
    assert!(body["version"].is_string());
}

// =============================================================================
// List
// =============================================================================

#[tokio::test]
async fn test_list_unscoped_returns_everything() {
    let app = TestApp::new().await;
    app.seed(vec![
        json!({"id": "a", "programId": "7"}),
        json!({"id": "b", "programId": 8}),
        json!({"id": "c"}),
    ])
    .await;

    let response = app
        .router()
        .oneshot(test_request("GET", "/api/criteria"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 3);
    assert_eq!(ids(&body), vec!["a", "b", "c"]);
    assert!(body.get("programId").is_none());
}

#[tokio::test]
async fn test_list_scoped_matches_across_types() {
    let app = TestApp::new().await;
    app.seed(vec![
        json!({"id": "text", "programId": "7"}),
        json!({"id": "number", "programId": 7}),
        json!({"id": "other", "programId": 8}),
        json!({"id": "global"}),
    ])
    .await;

    let response = app
        .router()
        .oneshot(test_request("GET", "/api/criteria?programId=7"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(ids(&body), vec!["text", "number"]);
    assert_eq!(body["total"], 2);
    assert_eq!(body["programId"], "7");
}

#[tokio::test]
async fn test_list_blank_program_is_unscoped() {
    let app = TestApp::new().await;
    app.seed(vec![json!({"id": "a", "programId": 1}), json!({"id": "b"})]).await;

    let response = app
        .router()
        .oneshot(test_request("GET", "/api/criteria?programId="))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_list_applies_defaults() {
    let app = TestApp::new().await;
    app.seed(vec![json!({"id": "bare", "programId": 3})]).await;

    let response = app
        .router()
        .oneshot(test_request("GET", "/api/criteria?programId=3"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let criterion = &body["criteria"][0];

    assert_eq!(criterion["name"], "Untitled Criterion");
    assert_eq!(criterion["description"], "No description provided");
    assert_eq!(criterion["weight"], 10.0);
    assert_eq!(criterion["importance"], 3);
    assert_eq!(criterion["color"], "#6366f1");
}

// =============================================================================
// Lookup
// =============================================================================

#[tokio::test]
async fn test_get_criterion() {
    let app = TestApp::new().await;
    app.seed(vec![json!({"id": 12, "name": "Team", "programId": 1})]).await;

    let response = app
        .router()
        .oneshot(test_request("GET", "/api/criteria/12"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["id"], "12");
    assert_eq!(body["name"], "Team");
}

#[tokio::test]
async fn test_get_unknown_criterion_is_404() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(test_request("GET", "/api/criteria/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_criterion() {
    let app = TestApp::new().await;
    let mut events = app.state.events.subscribe_receiver();

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/criteria",
            json!({
                "programId": "42",
                "programIdNum": 42,
                "criterion": {"id": "new-1", "name": "Traction", "weight": 30}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["id"], "new-1");
    assert_eq!(body["programId"], "42");
    assert_eq!(body["weight"], 30.0);

    // Visible in the program's view
    let listed = app
        .router()
        .oneshot(test_request("GET", "/api/criteria?programId=42"))
        .await
        .unwrap();
    assert_eq!(ids(&extract_json(listed.into_body()).await), vec!["new-1"]);

    // Subscribers were told
    let event = events.try_recv().expect("Should publish CriterionCreated");
    assert_eq!(event.criterion.id.as_str(), "new-1");
    assert!(event.program_id.matches(&ProgramId::from(42)));

    // Written through to the cache
    let cached = app.state.cache.fetch(Some(&ProgramId::from(42))).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].criterion_id().unwrap().as_str(), "new-1");
}

#[tokio::test]
async fn test_create_uses_numeric_program_when_text_missing() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/criteria",
            json!({"programId": null, "programIdNum": 5, "criterion": {"id": "n1"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["programId"], 5);
}

#[tokio::test]
async fn test_create_replaces_existing_id() {
    let app = TestApp::new().await;
    app.seed(vec![json!({"id": "dup", "weight": 10, "programId": 1})]).await;

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/criteria",
            json!({"programId": "1", "criterion": {"id": "dup", "weight": 60}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    assert_eq!(app.state.store.len(), 1);
    let stored = app.state.store.all();
    assert_eq!(stored[0].weight, 60.0);
}

#[tokio::test]
async fn test_create_without_program_is_400() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/criteria",
            json!({"criterion": {"id": "orphan"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.state.store.is_empty());
}

#[tokio::test]
async fn test_create_without_id_is_400() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(json_request(
            "POST",
            "/api/criteria",
            json!({"programId": "1", "criterion": {"name": "No id"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("id"));
    assert!(app.state.store.is_empty());
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_pulls_new_feed_data() {
    let app = TestApp::new().await;
    app.memory.push(raw(json!({"id": "late", "programId": 9})));

    let response = app
        .router()
        .oneshot(test_request("POST", "/api/criteria/refresh?programId=9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = extract_json(response.into_body()).await;
    assert_eq!(report["programId"], "9");
    assert_eq!(report["total"], 1);
    assert_eq!(report["sources"].as_array().unwrap().len(), 2);
    assert!(report["failed"].as_array().unwrap().is_empty());

    assert!(app
        .state
        .store
        .get(&accelera_common::CriterionId::from("late"))
        .is_some());
}
