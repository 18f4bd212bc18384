//! Bridge WebSocket integration tests
//!
//! Exercise the `/ws/audio` endpoint against a real server bound to an
//! ephemeral port. None of these tests need vendor credentials: they
//! only drive the browser-facing protocol up to the point where a live
//! session would be dialed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use livebridge::{
    ServerConfig, middleware::connection_limit_middleware, routes, state::AppState,
};

fn test_config() -> ServerConfig {
    // ServerConfig implements Drop (key zeroization), so no struct update
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.gemini_api_key = Some("AIza-test-key".to_string());
    config
}

/// Bind the bridge router to an ephemeral port and serve it.
async fn spawn_server(config: ServerConfig) -> SocketAddr {
    let app_state = Arc::new(AppState::new(config).await);

    let app = routes::api::create_api_router()
        .merge(
            routes::bridge::create_bridge_router().layer(middleware::from_fn_with_state(
                app_state.clone(),
                connection_limit_middleware,
            )),
        )
        .with_state(app_state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
> {
    let url = format!("ws://{addr}/ws/audio");
    let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("WebSocket handshake failed");
    ws
}

/// Wait for the next JSON text frame, skipping pings.
async fn next_json(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> serde_json::Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for message")
            .expect("Stream ended unexpectedly")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).expect("Invalid JSON"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_bad_json_gets_error_reply() {
    let addr = spawn_server(test_config()).await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text("not json".into())).await.unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "parse_error");

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_oversized_text_rejected_without_close() {
    let addr = spawn_server(test_config()).await;
    let mut ws = connect(addr).await;

    let big = "a".repeat(50 * 1024 + 1);
    let msg = serde_json::json!({"type": "text", "text": big});
    ws.send(Message::Text(msg.to_string().into())).await.unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "validation_error");

    // The socket stays open; a second message still gets a reply
    ws.send(Message::Text("still not json".into()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_unsupported_sample_rate_in_start_rejected() {
    let addr = spawn_server(test_config()).await;
    let mut ws = connect(addr).await;

    let msg = serde_json::json!({"type": "start", "input_sample_rate": 44100});
    ws.send(Message::Text(msg.to_string().into())).await.unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "validation_error");
    assert!(
        reply["message"]
            .as_str()
            .unwrap()
            .contains("Unsupported sample rate")
    );

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_audio_before_start_is_dropped() {
    let addr = spawn_server(test_config()).await;
    let mut ws = connect(addr).await;

    // 100ms of silence at 48kHz; no session yet, so nothing comes back
    let silence = vec![0u8; 9600];
    ws.send(Message::Binary(silence.into())).await.unwrap();

    // Follow with bad JSON; the first reply must be the parse error,
    // proving the audio produced no response
    ws.send(Message::Text("{".into())).await.unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], "parse_error");

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_cleanly() {
    let addr = spawn_server(test_config()).await;
    let mut ws = connect(addr).await;

    let msg = serde_json::json!({"type": "stop"});
    ws.send(Message::Text(msg.to_string().into())).await.unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "closing");
    assert!(reply["reason"].as_str().unwrap().contains("stop"));

    // Server closes the socket after the closing notice
    let close = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for close");
    match close {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("Expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_per_ip_connection_limit() {
    let mut config = test_config();
    config.max_connections_per_ip = 1;
    let addr = spawn_server(config).await;

    let _ws1 = connect(addr).await;

    // Second connection from the same IP is refused during the handshake
    let url = format!("ws://{addr}/ws/audio");
    let result = tokio_tungstenite::connect_async(url.as_str()).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 429);
        }
        other => panic!("Expected HTTP 429 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slot_released_after_disconnect() {
    let mut config = test_config();
    config.max_connections_per_ip = 1;
    let addr = spawn_server(config).await;

    let mut ws = connect(addr).await;
    ws.close(None).await.unwrap();
    // Drain until the stream ends so the server sees the close
    while let Some(msg) = ws.next().await {
        if msg.is_err() {
            break;
        }
    }

    // Give the handler a moment to release the slot
    tokio::time::sleep(Duration::from_millis(200)).await;

    let _ws2 = connect(addr).await;
}
