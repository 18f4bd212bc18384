//! Gemini Live API provider.
//!
//! Implements the `BaseLive` trait over Google's `BidiGenerateContent`
//! WebSocket protocol.

mod client;
mod config;
mod messages;

pub use client::GeminiLive;
pub use config::{
    GEMINI_INPUT_AUDIO_MIME, GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE,
    GeminiLiveModel, GeminiVoice,
};
pub use messages::{ClientMessage, ServerMessage};
