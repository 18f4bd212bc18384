//! Live audio-to-audio provider module.
//!
//! This module provides abstractions and an implementation for real-time
//! bidirectional audio streaming with a hosted speech model.
//!
//! # Supported Providers
//!
//! - **Gemini Live API** - Full duplex native audio over BidiGenerateContent
//!
//! # Architecture
//!
//! - `BaseLive` trait for provider abstraction
//! - Factory function for provider creation by name
//! - Callback-based event handling
//!
//! # Example
//!
//! ```rust,ignore
//! use livebridge::core::live::{create_live_provider, LiveConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LiveConfig {
//!         api_key: "AIza...".to_string(),
//!         voice: Some("Zephyr".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let mut provider = create_live_provider("gemini", config).unwrap();
//!
//!     provider.on_transcript(Arc::new(|t| Box::pin(async move {
//!         println!("[{}] {}", t.role, t.text);
//!     }))).unwrap();
//!
//!     provider.connect().await.unwrap();
//!     provider.send_audio(audio_bytes).await.unwrap();
//! }
//! ```

mod base;
pub mod gemini;

pub use base::{
    AudioOutputCallback, BaseLive, BoxedLive, ConnectionState, LiveAudioData, LiveConfig,
    LiveError, LiveErrorCallback, LiveResult, ReconnectionCallback, ReconnectionConfig,
    ReconnectionEvent, TranscriptCallback, TranscriptResult, TranscriptRole, TurnEvent,
    TurnEventCallback,
};
pub use gemini::{
    GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, GeminiLive,
    GeminiLiveModel, GeminiVoice,
};

/// Supported live providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveProvider {
    /// Gemini Live API
    Gemini,
}

impl LiveProvider {
    /// Parse provider from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" | "gemini-live" | "gemini_live" => Some(LiveProvider::Gemini),
            _ => None,
        }
    }
}

impl std::fmt::Display for LiveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Factory function to create a live provider.
///
/// # Supported Providers
///
/// - `"gemini"` - Gemini Live API (BidiGenerateContent)
pub fn create_live_provider(provider_type: &str, config: LiveConfig) -> LiveResult<BoxedLive> {
    match LiveProvider::parse(provider_type) {
        Some(LiveProvider::Gemini) => Ok(Box::new(GeminiLive::new(config)?)),
        None => Err(LiveError::InvalidConfiguration(format!(
            "Unknown live provider '{}'. Supported providers: gemini",
            provider_type
        ))),
    }
}

/// Get list of supported live providers.
pub fn get_supported_live_providers() -> Vec<&'static str> {
    vec!["gemini"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_live_provider() {
        let config = LiveConfig {
            api_key: "test_key".to_string(),
            ..Default::default()
        };
        assert!(create_live_provider("gemini", config.clone()).is_ok());
        assert!(create_live_provider("GEMINI", config.clone()).is_ok());
        assert!(create_live_provider("google", config).is_ok());

        let invalid = create_live_provider("invalid", LiveConfig::default());
        assert!(invalid.is_err());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(LiveProvider::parse("gemini"), Some(LiveProvider::Gemini));
        assert_eq!(
            LiveProvider::parse("gemini-live"),
            Some(LiveProvider::Gemini)
        );
        assert_eq!(LiveProvider::parse("invalid"), None);
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(LiveProvider::Gemini.to_string(), "gemini");
    }

    #[test]
    fn test_invalid_provider_error_message() {
        let result = create_live_provider("invalid_provider", LiveConfig::default());
        match result {
            Err(LiveError::InvalidConfiguration(msg)) => {
                assert!(msg.contains("gemini"));
            }
            _ => panic!("Expected InvalidConfiguration error"),
        }
    }

    #[test]
    fn test_get_supported_providers() {
        let providers = get_supported_live_providers();
        assert_eq!(providers, vec!["gemini"]);
    }
}
