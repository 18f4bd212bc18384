//! Audio bridge WebSocket handlers
//!
//! This module provides the WebSocket endpoint that relays browser
//! microphone audio to the Gemini Live API and streams synthesized
//! voice back.
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **start**: Start the live session (model, voice, language,
//!   instructions, greeting, sample-rate overrides)
//! - **text**: Send a text turn into the conversation
//! - **stop**: End the session and close the connection
//! - **Binary frames**: Microphone audio (PCM 16-bit LE, mono)
//!
//! ## Server → Client
//!
//! - **session_created**: Session established
//! - **transcript**: Speech transcription (user or assistant)
//! - **turn_event**: Turn lifecycle (started / complete / interrupted /
//!   generation_complete)
//! - **error**: Error message
//! - **closing**: Connection closing
//! - **Binary frames**: Synthesized audio (PCM 16-bit LE, mono, paced
//!   into 20ms frames at the client rate)

mod handler;
pub mod messages;

pub use handler::{BridgeQuery, bridge_handler};
