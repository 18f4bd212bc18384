//! Service info and demo page handlers.

use axum::response::{Html, IntoResponse};
use axum::{Json, http::StatusCode};
use serde_json::json;

/// Embedded browser demo page (microphone capture and playback)
const DEMO_PAGE: &str = include_str!("../../static/index.html");

/// Health check endpoint.
///
/// Returns service metadata so load balancers and humans can tell the
/// bridge is up.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Gemini Live audio bridge is running",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Serve the embedded browser demo page.
pub async fn demo_page() -> impl IntoResponse {
    Html(DEMO_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_is_ok() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_demo_page_is_html() {
        let response = demo_page().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"));
    }

    #[test]
    fn test_demo_page_embeds_ws_endpoint() {
        assert!(DEMO_PAGE.contains("/ws/audio"));
    }
}
