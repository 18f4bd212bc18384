//! Gemini Live API configuration types.
//!
//! This module contains configuration types for Google's Gemini Live API:
//! - Model selection (native-audio dialog models)
//! - Prebuilt voice selection
//! - Audio format constants

use serde::{Deserialize, Serialize};

/// Gemini Live API WebSocket endpoint (BidiGenerateContent).
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Sample rate for audio sent to the Gemini Live API.
pub const GEMINI_INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate of audio produced by the Gemini Live API.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// MIME type for input audio chunks.
pub const GEMINI_INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

// =============================================================================
// Models
// =============================================================================

/// Supported Gemini Live native-audio models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiLiveModel {
    /// Gemini 2.5 Flash native audio (September 2025 preview)
    #[default]
    #[serde(rename = "models/gemini-2.5-flash-native-audio-preview-09-2025")]
    Flash25NativeAudioPreview092025,
    /// Gemini 2.5 Flash native audio dialog preview
    #[serde(rename = "models/gemini-2.5-flash-preview-native-audio-dialog")]
    Flash25PreviewNativeAudioDialog,
    /// Gemini 2.0 Flash live
    #[serde(rename = "models/gemini-2.0-flash-live-001")]
    Flash20Live001,
}

impl GeminiLiveModel {
    /// Convert to the API resource name.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash25NativeAudioPreview092025 => {
                "models/gemini-2.5-flash-native-audio-preview-09-2025"
            }
            Self::Flash25PreviewNativeAudioDialog => {
                "models/gemini-2.5-flash-preview-native-audio-dialog"
            }
            Self::Flash20Live001 => "models/gemini-2.0-flash-live-001",
        }
    }

    /// Parse from string, with fallback to default.
    ///
    /// Accepts both bare model IDs and full `models/` resource names.
    pub fn from_str_or_default(s: &str) -> Self {
        let normalized = s.trim().trim_start_matches("models/").to_lowercase();
        match normalized.as_str() {
            "gemini-2.5-flash-native-audio-preview-09-2025" => {
                Self::Flash25NativeAudioPreview092025
            }
            "gemini-2.5-flash-preview-native-audio-dialog" => Self::Flash25PreviewNativeAudioDialog,
            "gemini-2.0-flash-live-001" => Self::Flash20Live001,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for GeminiLiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Prebuilt voices for Gemini Live audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiVoice {
    /// Zephyr voice (default)
    #[default]
    Zephyr,
    /// Puck voice
    Puck,
    /// Charon voice
    Charon,
    /// Kore voice
    Kore,
    /// Fenrir voice
    Fenrir,
    /// Aoede voice
    Aoede,
    /// Leda voice
    Leda,
    /// Orus voice
    Orus,
}

impl GeminiVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zephyr => "Zephyr",
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Kore => "Kore",
            Self::Fenrir => "Fenrir",
            Self::Aoede => "Aoede",
            Self::Leda => "Leda",
            Self::Orus => "Orus",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "zephyr" => Self::Zephyr,
            "puck" => Self::Puck,
            "charon" => Self::Charon,
            "kore" => Self::Kore,
            "fenrir" => Self::Fenrir,
            "aoede" => Self::Aoede,
            "leda" => Self::Leda,
            "orus" => Self::Orus,
            _ => Self::default(),
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [GeminiVoice] {
        &[
            Self::Zephyr,
            Self::Puck,
            Self::Charon,
            Self::Kore,
            Self::Fenrir,
            Self::Aoede,
            Self::Leda,
            Self::Orus,
        ]
    }
}

impl std::fmt::Display for GeminiVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_as_str() {
        assert_eq!(
            GeminiLiveModel::Flash25NativeAudioPreview092025.as_str(),
            "models/gemini-2.5-flash-native-audio-preview-09-2025"
        );
        assert_eq!(
            GeminiLiveModel::Flash20Live001.as_str(),
            "models/gemini-2.0-flash-live-001"
        );
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!(
            GeminiLiveModel::from_str_or_default(
                "models/gemini-2.5-flash-native-audio-preview-09-2025"
            ),
            GeminiLiveModel::Flash25NativeAudioPreview092025
        );
        // Bare model ID without the resource prefix
        assert_eq!(
            GeminiLiveModel::from_str_or_default("gemini-2.0-flash-live-001"),
            GeminiLiveModel::Flash20Live001
        );
        assert_eq!(
            GeminiLiveModel::from_str_or_default("unknown"),
            GeminiLiveModel::Flash25NativeAudioPreview092025
        );
    }

    #[test]
    fn test_voice_as_str() {
        assert_eq!(GeminiVoice::Zephyr.as_str(), "Zephyr");
        assert_eq!(GeminiVoice::Puck.as_str(), "Puck");
    }

    #[test]
    fn test_voice_from_str() {
        assert_eq!(GeminiVoice::from_str_or_default("zephyr"), GeminiVoice::Zephyr);
        assert_eq!(GeminiVoice::from_str_or_default("KORE"), GeminiVoice::Kore);
        assert_eq!(
            GeminiVoice::from_str_or_default("unknown"),
            GeminiVoice::Zephyr
        );
    }

    #[test]
    fn test_voice_all() {
        let voices = GeminiVoice::all();
        assert_eq!(voices.len(), 8);
        assert!(voices.contains(&GeminiVoice::Zephyr));
        assert!(voices.contains(&GeminiVoice::Aoede));
    }
}
