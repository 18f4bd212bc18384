//! Bridge WebSocket message types
//!
//! This module defines the browser-facing protocol for the audio bridge.
//! Control messages are JSON text frames tagged with `type`; audio travels
//! as binary PCM16-LE mono frames in both directions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::audio::is_supported_client_rate;

/// Maximum allowed size for instructions (100 KB)
pub const MAX_INSTRUCTIONS_SIZE: usize = 100 * 1024;

/// Maximum allowed size for text messages and greetings (50 KB)
pub const MAX_TEXT_SIZE: usize = 50 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from the browser client
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum BridgeIncomingMessage {
    /// Start a live session with the speech model
    #[serde(rename = "start")]
    Start(BridgeSessionConfig),

    /// Send a text turn into the conversation
    #[serde(rename = "text")]
    Text {
        /// Text content
        text: String,
    },

    /// End the session and close the connection
    #[serde(rename = "stop")]
    Stop,
}

/// Session configuration sent with `start`.
///
/// Every field is optional; unset fields fall back to the server
/// configuration defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeSessionConfig {
    /// Model to use (e.g., "models/gemini-2.5-flash-native-audio-preview-09-2025")
    #[serde(default)]
    pub model: Option<String>,

    /// Voice for synthesized output (e.g., "Zephyr", "Puck")
    #[serde(default)]
    pub voice: Option<String>,

    /// BCP-47 language code for synthesized output (e.g., "en-US")
    #[serde(default)]
    pub language_code: Option<String>,

    /// System instructions for the assistant
    #[serde(default)]
    pub instructions: Option<String>,

    /// Opening text turn sent right after the session is established
    #[serde(default)]
    pub greeting: Option<String>,

    /// Sample rate of the audio the client sends (overrides the query hint)
    #[serde(default)]
    pub input_sample_rate: Option<u32>,

    /// Sample rate the client wants returned audio resampled to
    #[serde(default)]
    pub output_sample_rate: Option<u32>,
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket messages to the browser client
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum BridgeOutgoingMessage {
    /// Session created/ready
    #[serde(rename = "session_created")]
    SessionCreated {
        /// Session ID
        session_id: String,
        /// Model in use
        model: String,
        /// Voice in use
        voice: String,
    },

    /// Transcript of user speech or model output
    #[serde(rename = "transcript")]
    Transcript {
        /// Transcribed text
        text: String,
        /// Role (user or assistant)
        role: String,
        /// Whether this is a final transcript
        is_final: bool,
    },

    /// Turn lifecycle event from the model
    #[serde(rename = "turn_event")]
    TurnEvent {
        /// Event name (started, complete, interrupted, generation_complete)
        event: String,
    },

    /// Error message
    #[serde(rename = "error")]
    Error {
        /// Error code (optional)
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Error message
        message: String,
    },

    /// Connection closing
    #[serde(rename = "closing")]
    Closing {
        /// Reason for closing
        reason: String,
    },
}

// =============================================================================
// Message Routing
// =============================================================================

/// Message routing for the sender task
pub enum BridgeMessageRoute {
    /// JSON text message
    Outgoing(BridgeOutgoingMessage),
    /// Binary audio data
    Audio(Bytes),
    /// Close connection
    Close,
}

// =============================================================================
// Validation
// =============================================================================

/// Error type for message validation failures
#[derive(Debug, Clone)]
pub enum BridgeValidationError {
    /// Instructions exceed maximum allowed size
    InstructionsTooLarge { size: usize, max: usize },
    /// Text content exceeds maximum allowed size
    TextTooLarge { size: usize, max: usize },
    /// Sample rate is not one of the supported rates
    UnsupportedSampleRate { rate: u32 },
}

impl std::fmt::Display for BridgeValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstructionsTooLarge { size, max } => {
                write!(
                    f,
                    "Instructions too large: {} bytes (max: {} bytes)",
                    size, max
                )
            }
            Self::TextTooLarge { size, max } => {
                write!(f, "Text too large: {} bytes (max: {} bytes)", size, max)
            }
            Self::UnsupportedSampleRate { rate } => {
                write!(
                    f,
                    "Unsupported sample rate: {} Hz (supported: 8000, 16000, 24000, 48000)",
                    rate
                )
            }
        }
    }
}

impl std::error::Error for BridgeValidationError {}

impl BridgeIncomingMessage {
    /// Validates message field sizes and rates to prevent resource
    /// exhaustion and broken audio pipelines.
    pub fn validate(&self) -> Result<(), BridgeValidationError> {
        match self {
            BridgeIncomingMessage::Start(config) => {
                if let Some(instructions) = &config.instructions {
                    let size = instructions.len();
                    if size > MAX_INSTRUCTIONS_SIZE {
                        return Err(BridgeValidationError::InstructionsTooLarge {
                            size,
                            max: MAX_INSTRUCTIONS_SIZE,
                        });
                    }
                }
                if let Some(greeting) = &config.greeting {
                    let size = greeting.len();
                    if size > MAX_TEXT_SIZE {
                        return Err(BridgeValidationError::TextTooLarge {
                            size,
                            max: MAX_TEXT_SIZE,
                        });
                    }
                }
                for rate in [config.input_sample_rate, config.output_sample_rate]
                    .into_iter()
                    .flatten()
                {
                    if !is_supported_client_rate(rate) {
                        return Err(BridgeValidationError::UnsupportedSampleRate { rate });
                    }
                }
            }
            BridgeIncomingMessage::Text { text } => {
                let size = text.len();
                if size > MAX_TEXT_SIZE {
                    return Err(BridgeValidationError::TextTooLarge {
                        size,
                        max: MAX_TEXT_SIZE,
                    });
                }
            }
            BridgeIncomingMessage::Stop => {}
        }
        Ok(())
    }
}
