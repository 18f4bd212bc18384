//! Server startup tests
//!
//! Verify that the router can be assembled from a minimal configuration
//! and that the public endpoints respond.

use axum::{body::Body, http::Request};
use std::sync::Arc;
use tower::util::ServiceExt;

use livebridge::{ServerConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config() -> ServerConfig {
    // ServerConfig implements Drop (key zeroization), so no struct update
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.gemini_api_key = Some("AIza-test-key".to_string());
    config
}

#[tokio::test]
async fn test_health_check_responds() {
    let app_state = Arc::new(AppState::new(create_minimal_config()).await);
    let app = routes::api::create_api_router().with_state(app_state);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["service"], "livebridge");
    assert!(json["message"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_demo_page_served() {
    let app_state = Arc::new(AppState::new(create_minimal_config()).await);
    let app = routes::api::create_api_router().with_state(app_state);

    let request = Request::builder()
        .uri("/demo")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8_lossy(&body);
    assert!(page.contains("/ws/audio"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app_state = Arc::new(AppState::new(create_minimal_config()).await);
    let app = routes::api::create_api_router().with_state(app_state);

    let request = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}
