//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check and demo page endpoints
//! - `bridge` - Audio bridge WebSocket (Gemini Live API)

pub mod api;
pub mod bridge;

// Re-export commonly used handlers for convenient access
pub use bridge::bridge_handler;
