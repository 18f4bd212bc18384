//! Gemini Live API WebSocket message types.
//!
//! This module defines the client and server message types for the
//! `BidiGenerateContent` streaming protocol. All messages are JSON-encoded
//! with camelCase field names and sent over WebSocket. The server may
//! deliver its JSON in either text or binary frames.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - First message of the session, selects model/voice/instructions
//! - realtimeInput - Base64 audio chunk (PCM 16-bit, 16kHz, mono)
//! - clientContent - Text turns, optionally completing the turn
//!
//! Server messages (received from server):
//! - setupComplete - Session is established, audio may flow
//! - serverContent - Model turn parts (audio/text), turn lifecycle flags,
//!   input/output transcriptions
//! - usageMetadata - Token accounting
//! - goAway - Server is about to drop the connection

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::GEMINI_INPUT_AUDIO_MIME;

// =============================================================================
// Client Messages
// =============================================================================

/// Top-level client message. Exactly one field is ever populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Session setup, must be the first message
    Setup {
        /// Setup payload
        setup: Setup,
    },
    /// Streaming media input
    RealtimeInput {
        /// Realtime input payload
        #[serde(rename = "realtimeInput")]
        realtime_input: RealtimeInput,
    },
    /// Conversation text content
    ClientContent {
        /// Client content payload
        #[serde(rename = "clientContent")]
        client_content: ClientContent,
    },
}

impl ClientMessage {
    /// Build a realtimeInput message from a raw PCM16 16kHz chunk.
    pub fn audio_chunk(pcm: &[u8]) -> Self {
        ClientMessage::RealtimeInput {
            realtime_input: RealtimeInput {
                audio: AudioBlob {
                    data: BASE64_STANDARD.encode(pcm),
                    mime_type: GEMINI_INPUT_AUDIO_MIME.to_string(),
                },
            },
        }
    }

    /// Build a completed user text turn.
    pub fn user_text(text: &str) -> Self {
        ClientMessage::ClientContent {
            client_content: ClientContent {
                turns: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        text: Some(text.to_string()),
                        inline_data: None,
                    }],
                }],
                turn_complete: true,
            },
        }
    }
}

/// Session setup payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Model resource name (e.g. "models/gemini-2.0-flash-live-001")
    pub model: String,

    /// Generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,

    /// System instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Request transcription of model audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,

    /// Request transcription of user audio input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,
}

/// Generation configuration within setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Response modalities; audio-native models accept exactly ["AUDIO"]
    pub response_modalities: Vec<String>,

    /// Speech synthesis configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Voice selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_config: Option<VoiceConfig>,

    /// BCP-47 language code (e.g. "en-US")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// Voice selection wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// Prebuilt voice selection
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// Prebuilt voice selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    /// Voice name (e.g. "Zephyr")
    pub voice_name: String,
}

/// Marker config enabling audio transcription. Serialized as `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTranscriptionConfig {}

/// Streaming media input payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    /// Audio chunk
    pub audio: AudioBlob,
}

/// Base64-encoded media blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlob {
    /// Base64-encoded payload
    pub data: String,
    /// MIME type (e.g. "audio/pcm;rate=16000")
    pub mime_type: String,
}

/// Conversation content payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    /// Turns to append to the conversation
    pub turns: Vec<Content>,
    /// Whether the turn is complete and the model should respond
    pub turn_complete: bool,
}

/// A content block: role plus parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Role of the content author (user or model)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Build a role-less content block from plain text, used for
    /// system instructions.
    pub fn from_text(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }
    }
}

/// A single content part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary content (base64), audio for native-audio models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<AudioBlob>,
}

// =============================================================================
// Server Messages
// =============================================================================

/// Top-level server message. The server populates at most one of the
/// payload fields per frame; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Acknowledges setup; the session is ready
    pub setup_complete: Option<SetupComplete>,

    /// Model output and turn lifecycle flags
    pub server_content: Option<ServerContent>,

    /// Token usage accounting
    pub usage_metadata: Option<UsageMetadata>,

    /// Server-initiated shutdown notice
    pub go_away: Option<GoAway>,
}

/// Empty setup acknowledgment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupComplete {}

/// Model output content and turn lifecycle flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    /// Model turn content (audio and/or text parts)
    pub model_turn: Option<Content>,

    /// The model finished its turn
    #[serde(default)]
    pub turn_complete: Option<bool>,

    /// The user interrupted the model (barge-in)
    #[serde(default)]
    pub interrupted: Option<bool>,

    /// The model finished generating for the current request
    #[serde(default)]
    pub generation_complete: Option<bool>,

    /// Transcription of user audio input
    pub input_transcription: Option<Transcription>,

    /// Transcription of model audio output
    pub output_transcription: Option<Transcription>,
}

/// Transcription fragment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    /// Transcribed text
    #[serde(default)]
    pub text: String,
    /// Whether the transcription is finished
    #[serde(default)]
    pub finished: Option<bool>,
}

/// Token usage accounting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt tokens consumed
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    /// Response tokens produced
    #[serde(default)]
    pub response_token_count: Option<u64>,
    /// Total tokens for the session so far
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

/// Server-initiated shutdown notice.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    /// Remaining time before the connection is dropped (e.g. "10s")
    pub time_left: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
