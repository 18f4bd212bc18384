//! Bridge WebSocket route configuration
//!
//! This module configures the WebSocket endpoint that bridges browser
//! audio to the Gemini Live API.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::bridge::bridge_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the bridge WebSocket router
///
/// # Endpoint
///
/// `GET /ws/audio` - WebSocket upgrade for bidirectional audio streaming.
/// An optional `sample-rate` query parameter declares the client capture
/// rate (8000, 16000, 24000 or 48000; default 48000).
///
/// # Protocol
///
/// After WebSocket upgrade, clients send:
/// 1. `start` message to configure model, voice, instructions
/// 2. Binary audio frames (PCM 16-bit LE, mono, at the declared rate)
///
/// Server responds with:
/// - `session_created` when the live session is established
/// - `transcript` for speech transcription
/// - `turn_event` for turn lifecycle changes
/// - Binary audio frames with synthesized voice
/// - `error` on failures
///
/// # Example
///
/// ```json
/// // Client sends start
/// {"type": "start", "voice": "Zephyr"}
///
/// // Server responds
/// {"type": "session_created", "session_id": "...", "model": "...", "voice": "Zephyr"}
///
/// // Client streams microphone audio as binary frames
/// // Server streams back transcripts, turn events and voice audio
/// ```
pub fn create_bridge_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/audio", get(bridge_handler))
        .layer(TraceLayer::new_for_http())
}
