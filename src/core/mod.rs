//! Core functionality for the bridge.
//!
//! - `audio` - PCM conversion, resampling and output pacing
//! - `live` - Live audio-to-audio provider clients

pub mod audio;
pub mod live;
