// HTTP boundary tests for the audience routes

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use panel_audience::core::{AudienceEngine, AudienceQuery, PageLimits};
use panel_audience::models::{AudiencePage, AudienceResult, ErrorResponse, Panelist};
use panel_audience::routes::{configure_routes, handle_json_payload_error, AppState};
use panel_audience::services::{AuthGate, Claims, InMemoryPanelistStore, PanelistStore, StoreError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SECRET: &str = "api-test-secret";

struct CountingStore {
    inner: InMemoryPanelistStore,
    queries: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl PanelistStore for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn query_audience(&self, query: &AudienceQuery) -> Result<AudiencePage, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Backend("password authentication failed for user panel".into()));
        }
        self.inner.query_audience(query).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.fail)
    }
}

fn panelists() -> Vec<Panelist> {
    serde_json::from_value(json!([
        {"panelist_id": "p1", "program": "wave1", "age": 25, "location": "US-CA", "interests": ["sports"]},
        {"panelist_id": "p2", "program": "wave1", "age": 40, "location": "US-NY", "interests": ["music"]},
        {"panelist_id": "p3", "program": "wave1", "age": 30, "location": "US-TX", "interests": []},
        {"panelist_id": "p4", "program": "wave2", "age": 22, "location": "US-CA", "interests": ["sports"]}
    ]))
    .unwrap()
}

fn setup(fail: bool) -> (AppState, Arc<CountingStore>) {
    let store = Arc::new(CountingStore {
        inner: InMemoryPanelistStore::new(panelists()),
        queries: AtomicUsize::new(0),
        fail,
    });
    let roles = HashMap::from([("admin".to_string(), vec!["manage_panelists".to_string()])]);
    let state = AppState {
        engine: AudienceEngine::new(store.clone(), PageLimits::default()),
        auth: Arc::new(AuthGate::new(SECRET, None, roles)),
    };
    (state, store)
}

fn bearer(role: &str) -> (String, String) {
    let claims = Claims {
        sub: "admin-7".to_string(),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
        role: Some(role.to_string()),
        capabilities: vec![],
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
    ("Authorization".to_string(), format!("Bearer {}", token))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_lists_matching_audience() {
    let (state, store) = setup(false);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(bearer("admin"))
        .set_json(json!({
            "filters": {"program": "wave1", "age_range": [18, 34], "location": ["US-CA", "US-NY"]}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: AudienceResult = test::read_body_json(resp).await;
    assert_eq!(body.count, 1);
    assert_eq!(body.members[0].panelist_id, "p1");
    assert_eq!(store.queries.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_unauthorized_never_reaches_store() {
    let (state, store) = setup(false);
    let app = init_app!(state);

    let anonymous = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .set_json(json!({"filters": {"program": "wave1"}}))
        .to_request();
    let resp = test::call_service(&app, anonymous).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let panelist = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(bearer("panelist"))
        .set_json(json!({"filters": {"program": "wave1"}}))
        .to_request();
    let resp = test::call_service(&app, panelist).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "unauthorized");
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_unauthorized_checked_before_body() {
    let (state, _store) = setup(false);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_missing_program_is_bad_request() {
    let (state, store) = setup(false);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(bearer("admin"))
        .set_json(json!({"filters": {"gender": "female"}}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.message, "program is required");
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_inverted_range_is_bad_request() {
    let (state, store) = setup(false);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(bearer("admin"))
        .set_json(json!({"filters": {"program": "wave1", "income_range": [90000, 10000]}}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let (state, _store) = setup(false);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(bearer("admin"))
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "invalid_json");
}

#[actix_web::test]
async fn test_store_failure_is_generic_500() {
    let (state, store) = setup(true);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience")
        .insert_header(bearer("admin"))
        .set_json(json!({"filters": {"program": "wave1"}}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "internal_error");
    assert!(!body.message.contains("password"));
    assert!(body.incident_id.is_some());
    assert_eq!(store.queries.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_count_endpoint() {
    let (state, _store) = setup(false);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience/count")
        .insert_header(bearer("admin"))
        .set_json(json!({"filters": {"program": "wave1", "interests": ["sports", "music"]}}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["program"], "wave1");
}

#[actix_web::test]
async fn test_health_reports_store() {
    let (state, _store) = setup(true);
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"], "counting");
}

#[actix_web::test]
async fn test_empty_and_blank_program_share_message() {
    let (state, store) = setup(false);
    let app = init_app!(state);

    for program in ["", "   "] {
        let req = test::TestRequest::post()
            .uri("/api/v1/admin/audience/count")
            .insert_header(bearer("admin"))
            .set_json(json!({"filters": {"program": program}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "program is required");
    }

    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_lowercase_bearer_scheme_accepted() {
    let (state, _store) = setup(false);
    let app = init_app!(state);

    let (name, value) = bearer("admin");
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/audience/count")
        .insert_header((name, value.replacen("Bearer", "bearer", 1)))
        .set_json(json!({"filters": {"program": "wave1"}}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
}
