//! Gemini Live audio bridge
//!
//! A small WebSocket server that relays browser microphone audio to the
//! Gemini Live API (BidiGenerateContent) and streams synthesized voice
//! back, resampling between the client capture rate and the fixed model
//! rates (16kHz in, 24kHz out).

pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use crate::core::*;
pub use errors::{AppError, AppResult};
pub use state::AppState;
