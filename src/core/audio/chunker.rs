//! Output pacing buffer for synthesized audio.
//!
//! The model delivers audio in bursts much faster than real time. The
//! bridge accumulates resampled output and releases it to the client in
//! whole 20ms frames, holding back until at least 100ms is pending so
//! playback does not stutter on the first frames of a turn. The
//! remainder is drained when the turn completes, and everything pending
//! is dropped when the user barges in.

use bytes::Bytes;

/// Frame duration sent to the client.
const FRAME_MS: u32 = 20;

/// Minimum buffered audio before frames start flowing.
const MIN_FLUSH_MS: u32 = 100;

/// Accumulates PCM16-LE bytes and emits fixed-duration frames.
#[derive(Debug)]
pub struct FrameChunker {
    buffer: Vec<u8>,
    frame_bytes: usize,
    min_flush_bytes: usize,
}

impl FrameChunker {
    /// Create a chunker for the given output sample rate.
    pub fn new(sample_rate: u32) -> Self {
        let bytes_per_sec = sample_rate as usize * 2;
        Self {
            buffer: Vec::new(),
            frame_bytes: bytes_per_sec * FRAME_MS as usize / 1000,
            min_flush_bytes: bytes_per_sec * MIN_FLUSH_MS as usize / 1000,
        }
    }

    /// Size of one emitted frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Bytes currently pending.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append audio and return any frames ready to send.
    ///
    /// Frames are only released once the low-water mark is reached, and
    /// always in whole multiples of the frame size.
    pub fn push(&mut self, pcm: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(pcm);

        let mut frames = Vec::new();
        while self.buffer.len() >= self.min_flush_bytes {
            let flush = (self.buffer.len() / self.frame_bytes) * self.frame_bytes;
            if flush == 0 {
                break;
            }
            for chunk in self.buffer[..flush].chunks(self.frame_bytes) {
                frames.push(Bytes::copy_from_slice(chunk));
            }
            self.buffer.drain(..flush);
        }
        frames
    }

    /// Flush whatever is left, e.g. at the end of a model turn.
    pub fn drain(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = Bytes::from(std::mem::take(&mut self.buffer));
        Some(rest)
    }

    /// Drop all pending audio. Used on barge-in so a stale turn is
    /// never replayed after the model was interrupted.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sizing() {
        // 20ms at 48kHz mono PCM16 = 48000 * 2 * 0.02 = 1920 bytes
        let chunker = FrameChunker::new(48000);
        assert_eq!(chunker.frame_bytes(), 1920);

        // 20ms at 16kHz = 640 bytes
        let chunker = FrameChunker::new(16000);
        assert_eq!(chunker.frame_bytes(), 640);
    }

    #[test]
    fn test_holds_until_low_water_mark() {
        let mut chunker = FrameChunker::new(16000);
        // 60ms: under the 100ms mark, nothing released
        let frames = chunker.push(&vec![0u8; 640 * 3]);
        assert!(frames.is_empty());
        assert_eq!(chunker.pending(), 640 * 3);

        // Another 60ms crosses the mark: whole frames flow
        let frames = chunker.push(&vec![0u8; 640 * 3]);
        assert_eq!(frames.len(), 6);
        assert!(frames.iter().all(|f| f.len() == 640));
        assert_eq!(chunker.pending(), 0);
    }

    #[test]
    fn test_partial_frame_stays_buffered() {
        let mut chunker = FrameChunker::new(16000);
        let frames = chunker.push(&vec![0u8; 640 * 5 + 100]);
        assert_eq!(frames.len(), 5);
        assert_eq!(chunker.pending(), 100);
    }

    #[test]
    fn test_drain_returns_remainder() {
        let mut chunker = FrameChunker::new(16000);
        let _ = chunker.push(&vec![7u8; 100]);
        let rest = chunker.drain().expect("remainder expected");
        assert_eq!(rest.len(), 100);
        assert!(chunker.drain().is_none());
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut chunker = FrameChunker::new(16000);
        let _ = chunker.push(&vec![0u8; 500]);
        chunker.clear();
        assert_eq!(chunker.pending(), 0);
        assert!(chunker.drain().is_none());
    }
}
