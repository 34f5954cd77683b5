use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use learning_platform::{
    AppConfig, AppState, JsonRepository, JsonStore, MAX_BODY_BYTES, create_router,
    models::{Role, User},
    repository::RepositoryState,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestRouter {
    app: Router,
    admin_id: Uuid,
}

/// A router over a fresh data directory with one admin, reachable through the local
/// `x-user-id` bypass.
async fn setup() -> TestRouter {
    let dir = std::env::temp_dir().join(format!("learning-platform-router-{}", Uuid::new_v4()));
    let repo = Arc::new(JsonRepository::new(JsonStore::new(dir))) as RepositoryState;
    let admin = repo
        .create_user(User::new("boss".to_string(), None, "x".to_string(), Role::Admin))
        .await
        .unwrap();

    TestRouter {
        app: create_router(AppState::new(repo, AppConfig::default())),
        admin_id: admin.id,
    }
}

impl TestRouter {
    async fn send(&self, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .header("x-user-id", self.admin_id.to_string())
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn send_json(&self, method: &str, uri: &str, payload: Value) -> (StatusCode, Value) {
        self.send(method, uri, Body::from(payload.to_string())).await
    }

    /// Creates subject `algebra` with one section and topic; returns the content URI.
    async fn seed_topic(&self) -> String {
        self.send_json(
            "POST",
            "/admin/subjects",
            json!({"name": "Algebra", "description": "Equations"}),
        )
        .await;
        let (_, section) = self
            .send_json(
                "POST",
                "/admin/subjects/algebra/sections",
                json!({"name": "Linear", "description": "One unknown"}),
            )
            .await;
        let section_id = section["id"].as_str().unwrap().to_string();
        let (_, topic) = self
            .send_json(
                "POST",
                &format!("/admin/subjects/algebra/sections/{section_id}/topics"),
                json!({"name": "Solving", "description": "Isolate x"}),
            )
            .await;
        let topic_id = topic["id"].as_str().unwrap();
        format!("/admin/subjects/algebra/sections/{section_id}/topics/{topic_id}/content")
    }
}

#[tokio::test]
async fn test_empty_body_adds_default_text_block() {
    let router = setup().await;
    let content_uri = router.seed_topic().await;

    let (status, block) = router.send("POST", &content_uri, Body::empty()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(block["type"], "text");
    assert_eq!(block["value"], "");
}

#[tokio::test]
async fn test_edit_block_type_through_router() {
    let router = setup().await;
    let content_uri = router.seed_topic().await;

    let (status, block) = router
        .send_json(
            "POST",
            &content_uri,
            json!({"type": "image", "value": {"url": "https://x/y.jpg", "caption": "Cap", "alt_text": "Alt"}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let block_uri = format!("{content_uri}/{}", block["id"].as_str().unwrap());

    let (status, edited) = router
        .send_json("PUT", &block_uri, json!({"type": "text"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["type"], "text");
    assert_eq!(edited["value"], "Image: Cap\nURL: https://x/y.jpg");

    let (status, body) = router
        .send_json("PUT", &block_uri, json!({"type": "table", "value": "{not json"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid format for content type");

    let (status, _) = router.send("DELETE", &block_uri, Body::empty()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = router.send("DELETE", &block_uri, Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let router = setup().await;
    let content_uri = router.seed_topic().await;

    let huge = vec![b' '; MAX_BODY_BYTES + 1];
    let (status, _) = router.send("POST", &content_uri, Body::from(huge)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_public_catalogue_is_sanitized() {
    let router = setup().await;
    router
        .send_json(
            "POST",
            "/admin/subjects",
            json!({"name": "Chem & Bio", "description": "<b>Cells</b> \"and\" atoms"}),
        )
        .await;

    let (status, subjects) = router.send("GET", "/subjects", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subjects[0]["name"], "Chem &amp; Bio");
    assert_eq!(subjects[0]["description"], "Cells \"and\" atoms");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let router = setup().await;
    let (status, doc) = router
        .send("GET", "/api-docs/openapi.json", Body::empty())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/admin/subjects").is_some());
}
