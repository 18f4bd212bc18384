//! Base traits and types for live audio-to-audio providers.
//!
//! A live provider holds a bidirectional streaming session with a hosted
//! speech model: microphone audio goes up, synthesized voice, transcripts
//! and turn events come back.
//!
//! # Audio Format
//!
//! Input audio is PCM 16-bit signed little-endian mono at 16kHz. Output
//! audio arrives as PCM 16-bit signed little-endian mono at the rate
//! carried in each [`LiveAudioData`] (24kHz for Gemini).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during live session operations.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Session error
    #[error("Session error: {0}")]
    SessionError(String),
}

/// Result type for live session operations.
pub type LiveResult<T> = Result<T, LiveError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Configuration for automatic reconnection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectionConfig {
    /// Enable automatic reconnection on connection loss.
    /// Default: true
    pub enabled: bool,

    /// Maximum number of reconnection attempts before giving up.
    /// Set to 0 for unlimited attempts.
    /// Default: 5
    pub max_attempts: u32,

    /// Initial delay between reconnection attempts (milliseconds).
    /// Default: 1000ms
    pub initial_delay_ms: u64,

    /// Maximum delay between reconnection attempts (milliseconds).
    /// Default: 30000ms (30 seconds)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff.
    /// Default: 2.0
    pub backoff_multiplier: f32,

    /// Whether to add jitter to the delay to prevent thundering herd.
    /// Default: true
    pub jitter: bool,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ReconnectionConfig {
    /// Create a config with reconnection disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number using exponential backoff.
    /// Returns the delay in milliseconds.
    pub fn calculate_delay(&self, attempt: u32) -> u64 {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier as f64;

        let delay = base_delay * multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = delay.min(self.max_delay_ms as f64);

        if self.jitter {
            // Add up to 25% jitter
            let jitter_range = delay * 0.25;
            let jitter = rand_jitter(jitter_range);
            (delay + jitter).max(0.0) as u64
        } else {
            delay as u64
        }
    }

    /// Check if more reconnection attempts are allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt < self.max_attempts)
    }
}

/// Generate a pseudo-random jitter value using a simple LCG.
/// This avoids pulling in the rand crate for a simple use case.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;
    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let random = ((seed.wrapping_mul(1103515245).wrapping_add(12345)) % (1 << 31)) as f64;
    let normalized = random / (1u64 << 31) as f64; // 0.0 to 1.0
    (normalized - 0.5) * 2.0 * range // -range to +range
}

/// Base configuration for live providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    /// API key for authentication
    pub api_key: String,

    /// Override the provider WebSocket endpoint. Unset means the
    /// provider's production endpoint; tests point this at a local server.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Provider name (e.g., "gemini")
    #[serde(default)]
    pub provider: String,

    /// Model to use (e.g., "models/gemini-2.5-flash-native-audio-preview-09-2025")
    #[serde(default)]
    pub model: String,

    /// Voice name for synthesized output
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

    /// Request transcription of user speech
    #[serde(default)]
    pub transcribe_input: bool,

    /// Request transcription of model speech
    #[serde(default)]
    pub transcribe_output: bool,

    /// Reconnection configuration for automatic reconnection on connection loss.
    #[serde(default)]
    pub reconnection: Option<ReconnectionConfig>,
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for live providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Reconnecting after connection loss
    Reconnecting,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Reconnecting => write!(f, "Reconnecting"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Event Types
// =============================================================================

/// Transcript result from live transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// The transcribed text
    pub text: String,
    /// Role of the speaker (user or assistant)
    pub role: TranscriptRole,
    /// Whether this is a final transcript
    pub is_final: bool,
}

/// Role of the speaker in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// User speech transcript
    User,
    /// Assistant speech transcript
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Audio data from live synthesis.
#[derive(Debug, Clone)]
pub struct LiveAudioData {
    /// Raw audio bytes (PCM 16-bit, mono, little-endian)
    pub data: Bytes,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Turn lifecycle events from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// The model started producing a turn
    Started,
    /// The model finished the current turn; buffered audio may be flushed
    Complete,
    /// The user barged in; buffered audio for the turn must be discarded
    Interrupted,
    /// The model finished generating everything for the current request
    GenerationComplete,
}

impl fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnEvent::Started => write!(f, "started"),
            TurnEvent::Complete => write!(f, "complete"),
            TurnEvent::Interrupted => write!(f, "interrupted"),
            TurnEvent::GenerationComplete => write!(f, "generation_complete"),
        }
    }
}

/// Reconnection event details.
#[derive(Debug, Clone)]
pub struct ReconnectionEvent {
    /// Number of reconnection attempts made
    pub attempt: u32,
    /// Whether reconnection was successful
    pub success: bool,
    /// Error message if reconnection failed
    pub error: Option<String>,
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback type for transcript events.
pub type TranscriptCallback =
    Arc<dyn Fn(TranscriptResult) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for audio output events.
pub type AudioOutputCallback =
    Arc<dyn Fn(LiveAudioData) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for error events.
pub type LiveErrorCallback =
    Arc<dyn Fn(LiveError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for turn lifecycle events.
pub type TurnEventCallback =
    Arc<dyn Fn(TurnEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for reconnection events.
/// Called when the client reconnects after connection loss.
pub type ReconnectionCallback =
    Arc<dyn Fn(ReconnectionEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Base Trait
// =============================================================================

/// Base trait for live audio-to-audio providers.
///
/// # Example
///
/// ```rust,ignore
/// use livebridge::core::live::{BaseLive, LiveConfig, GeminiLive};
///
/// #[tokio::main]
/// async fn main() {
///     let config = LiveConfig {
///         api_key: "AIza...".to_string(),
///         model: "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
///         voice: Some("Zephyr".to_string()),
///         ..Default::default()
///     };
///
///     let mut live = GeminiLive::new(config)?;
///
///     live.on_audio(Arc::new(|audio| Box::pin(async move {
///         // Play audio
///     })))?;
///
///     live.connect().await?;
///     live.send_audio(pcm16_16khz_bytes).await?;
/// }
/// ```
#[async_trait]
pub trait BaseLive: Send + Sync {
    /// Create a new live provider instance.
    fn new(config: LiveConfig) -> LiveResult<Self>
    where
        Self: Sized;

    /// Connect to the live provider and establish a session.
    async fn connect(&mut self) -> LiveResult<()>;

    /// Disconnect from the live provider.
    async fn disconnect(&mut self) -> LiveResult<()>;

    /// Check if the provider is connected and the session is ready.
    fn is_ready(&self) -> bool;

    /// Get the current connection state.
    fn get_connection_state(&self) -> ConnectionState;

    // -------------------------------------------------------------------------
    // Audio I/O
    // -------------------------------------------------------------------------

    /// Send audio data to the provider.
    ///
    /// Audio must be PCM 16-bit, 16kHz, mono, little-endian.
    async fn send_audio(&mut self, audio_data: Bytes) -> LiveResult<()>;

    /// Send a user text turn to the conversation.
    ///
    /// The turn is marked complete so the model responds immediately.
    async fn send_text(&mut self, text: &str) -> LiveResult<()>;

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    /// Register a callback for transcript events.
    fn on_transcript(&mut self, callback: TranscriptCallback) -> LiveResult<()>;

    /// Register a callback for audio output events.
    fn on_audio(&mut self, callback: AudioOutputCallback) -> LiveResult<()>;

    /// Register a callback for error events.
    fn on_error(&mut self, callback: LiveErrorCallback) -> LiveResult<()>;

    /// Register a callback for turn lifecycle events.
    fn on_turn_event(&mut self, callback: TurnEventCallback) -> LiveResult<()>;

    /// Register a callback for reconnection events.
    fn on_reconnection(&mut self, callback: ReconnectionCallback) -> LiveResult<()>;

    /// Get provider information.
    fn get_provider_info(&self) -> serde_json::Value;
}

/// Boxed trait object for live providers.
pub type BoxedLive = Box<dyn BaseLive>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Reconnecting.to_string(), "Reconnecting");
    }

    #[test]
    fn test_transcript_role_display() {
        assert_eq!(TranscriptRole::User.to_string(), "user");
        assert_eq!(TranscriptRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_turn_event_display() {
        assert_eq!(TurnEvent::Started.to_string(), "started");
        assert_eq!(TurnEvent::Complete.to_string(), "complete");
        assert_eq!(TurnEvent::Interrupted.to_string(), "interrupted");
        assert_eq!(
            TurnEvent::GenerationComplete.to_string(),
            "generation_complete"
        );
    }

    #[test]
    fn test_default_config() {
        let config = LiveConfig::default();
        assert!(config.api_key.is_empty());
        assert!(config.voice.is_none());
        assert!(!config.transcribe_input);
    }

    #[test]
    fn test_error_display() {
        let err = LiveError::ConnectionFailed("test".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = LiveError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");
    }

    #[test]
    fn test_reconnection_config_default() {
        let config = ReconnectionConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 30000);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.jitter);
    }

    #[test]
    fn test_reconnection_should_retry() {
        let config = ReconnectionConfig::default();

        assert!(config.should_retry(0));
        assert!(config.should_retry(4));
        assert!(!config.should_retry(5));
        assert!(!config.should_retry(10));

        let disabled = ReconnectionConfig::disabled();
        assert!(!disabled.should_retry(0));
    }

    #[test]
    fn test_reconnection_unlimited_attempts() {
        let config = ReconnectionConfig {
            max_attempts: 0, // Unlimited
            ..Default::default()
        };

        assert!(config.should_retry(0));
        assert!(config.should_retry(100));
        assert!(config.should_retry(u32::MAX));
    }

    #[test]
    fn test_reconnection_calculate_delay_no_jitter() {
        let config = ReconnectionConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.calculate_delay(1), 1000);
        assert_eq!(config.calculate_delay(2), 2000);
        assert_eq!(config.calculate_delay(3), 4000);
        assert_eq!(config.calculate_delay(4), 8000);
        assert_eq!(config.calculate_delay(5), 16000);
        // Capped at max_delay_ms
        assert_eq!(config.calculate_delay(6), 30000);
    }

    #[test]
    fn test_reconnection_calculate_delay_with_jitter() {
        let config = ReconnectionConfig {
            initial_delay_ms: 1000,
            jitter: true,
            ..Default::default()
        };

        // With jitter, the delay should be within 25% of the base delay
        let delay = config.calculate_delay(1);
        assert!(
            (750..=1250).contains(&delay),
            "Delay {} should be within 750-1250",
            delay
        );
    }
}
