//! Audio format utilities for the bridge pipeline.
//!
//! Everything on the wire is mono PCM 16-bit signed little-endian. The
//! bridge converts between three fixed rates: the client capture rate
//! (48kHz browser default, 8kHz/16kHz for telephony clients), the model
//! input rate (16kHz) and the model output rate (24kHz).

mod chunker;
mod resampler;
mod wav_tap;

pub use chunker::FrameChunker;
pub use resampler::StreamResampler;
pub use wav_tap::WavTap;

/// Sample rate the Gemini Live API expects for input audio.
pub const MODEL_INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate the Gemini Live API produces for output audio.
pub const MODEL_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Default client capture rate (browser Web Audio API).
pub const DEFAULT_CLIENT_SAMPLE_RATE: u32 = 48000;

/// Client sample rates the bridge accepts.
pub const SUPPORTED_CLIENT_SAMPLE_RATES: &[u32] = &[8000, 16000, 24000, 48000];

/// Convert PCM16-LE bytes to samples.
///
/// A trailing odd byte is ignored; binary WebSocket frames are expected
/// to carry whole samples.
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Convert samples to PCM16-LE bytes.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Check whether a client-supplied sample rate is supported.
pub fn is_supported_client_rate(rate: u32) -> bool {
    SUPPORTED_CLIENT_SAMPLE_RATES.contains(&rate)
}
