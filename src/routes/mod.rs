//! Route configuration
//!
//! - `api` - Health check and demo page
//! - `bridge` - Audio bridge WebSocket endpoint

pub mod api;
pub mod bridge;
