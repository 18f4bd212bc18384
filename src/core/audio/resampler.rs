//! Stateful linear-interpolation resampler for mono PCM16 streams.
//!
//! Audio arrives in arbitrary-sized chunks from two continuous streams
//! (client microphone and model output), so the resampler carries its
//! fractional read position and the last consumed sample across calls.
//! Feeding a stream chunk by chunk produces the same samples as feeding
//! it in a single call.

/// Streaming sample-rate converter for mono PCM16.
///
/// Linear interpolation is sufficient here: the bridge converts between
/// speech-band rates that are small integer ratios of each other
/// (48kHz -> 16kHz, 24kHz -> 48kHz), and the model applies its own
/// front-end filtering.
#[derive(Debug)]
pub struct StreamResampler {
    src_rate: u32,
    dst_rate: u32,
    /// Read position of the next output sample, in source-sample units,
    /// relative to the carried `prev` sample (position 0).
    phase: f64,
    /// Last source sample of the previous chunk, interpolation anchor
    /// for the first outputs of the next chunk.
    prev: Option<i16>,
}

impl StreamResampler {
    /// Create a resampler converting `src_rate` to `dst_rate`.
    pub fn new(src_rate: u32, dst_rate: u32) -> Self {
        Self {
            src_rate,
            dst_rate,
            phase: 0.0,
            prev: None,
        }
    }

    /// Source rate in Hz.
    pub fn src_rate(&self) -> u32 {
        self.src_rate
    }

    /// Destination rate in Hz.
    pub fn dst_rate(&self) -> u32 {
        self.dst_rate
    }

    /// Whether this resampler is a passthrough (equal rates).
    pub fn is_passthrough(&self) -> bool {
        self.src_rate == self.dst_rate
    }

    /// Reset carried state, e.g. when a stream restarts.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.prev = None;
    }

    /// Resample one chunk, carrying state to the next call.
    pub fn process(&mut self, input: &[i16]) -> Vec<i16> {
        if self.is_passthrough() {
            return input.to_vec();
        }
        if input.is_empty() {
            return Vec::new();
        }

        let step = f64::from(self.src_rate) / f64::from(self.dst_rate);

        // Working timeline: carried prev at position 0 (when present),
        // then the chunk samples. Outputs are produced strictly inside
        // the interpolation window; the final sample becomes next
        // call's anchor so boundary positions are emitted exactly once.
        let (anchor, offset) = match self.prev {
            Some(p) => (p, 1.0),
            None => (input[0], 0.0),
        };
        let last_pos = offset + (input.len() - 1) as f64;

        let capacity = ((last_pos - self.phase) / step).max(0.0) as usize + 2;
        let mut out = Vec::with_capacity(capacity);

        let sample_at = |idx: usize| -> i16 {
            if offset == 0.0 {
                input[idx]
            } else if idx == 0 {
                anchor
            } else {
                input[idx - 1]
            }
        };

        while self.phase < last_pos {
            let idx = self.phase.floor() as usize;
            let frac = self.phase - idx as f64;
            let a = f64::from(sample_at(idx));
            let b = f64::from(sample_at(idx + 1));
            let value = a + (b - a) * frac;
            out.push(value.round().clamp(-32768.0, 32767.0) as i16);
            self.phase += step;
        }

        // Rebase so the last input sample is next call's position 0.
        self.phase -= last_pos;
        self.prev = Some(input[input.len() - 1]);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_is_identity() {
        let mut rs = StreamResampler::new(16000, 16000);
        let input: Vec<i16> = (0..320).map(|i| (i * 7 % 2000) as i16).collect();
        assert_eq!(rs.process(&input), input);
        assert!(rs.is_passthrough());
    }

    #[test]
    fn test_empty_input() {
        let mut rs = StreamResampler::new(48000, 16000);
        assert!(rs.process(&[]).is_empty());
    }

    #[test]
    fn test_downsample_ratio() {
        let mut rs = StreamResampler::new(48000, 16000);
        // 100ms at 48kHz -> expect roughly 100ms at 16kHz
        let input = vec![100i16; 4800];
        let out = rs.process(&input);
        let expected = 1600usize;
        assert!(
            out.len().abs_diff(expected) <= 2,
            "got {} samples, expected ~{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn test_upsample_ratio() {
        let mut rs = StreamResampler::new(24000, 48000);
        let input = vec![100i16; 2400];
        let out = rs.process(&input);
        let expected = 4800usize;
        assert!(
            out.len().abs_diff(expected) <= 2,
            "got {} samples, expected ~{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn test_constant_signal_preserved() {
        let mut rs = StreamResampler::new(24000, 16000);
        let out = rs.process(&vec![1234i16; 2400]);
        assert!(!out.is_empty());
        assert!(out.iter().all(|&s| s == 1234));
    }

    #[test]
    fn test_ramp_stays_monotonic_on_downsample() {
        let mut rs = StreamResampler::new(48000, 16000);
        let input: Vec<i16> = (0..4800).map(|i| i as i16).collect();
        let out = rs.process(&input);
        for w in out.windows(2) {
            assert!(w[0] <= w[1], "resampled ramp not monotonic");
        }
    }

    #[test]
    fn test_chunked_matches_whole() {
        let input: Vec<i16> = (0..9600)
            .map(|i| ((f64::from(i) * 0.03).sin() * 10000.0) as i16)
            .collect();

        let mut whole = StreamResampler::new(48000, 16000);
        let expected = whole.process(&input);

        let mut chunked = StreamResampler::new(48000, 16000);
        let mut got = Vec::new();
        // Deliberately awkward chunk sizes to cross interpolation windows
        for chunk in input.chunks(481) {
            got.extend(chunked.process(chunk));
        }

        assert_eq!(got.len(), expected.len());
        for (a, b) in got.iter().zip(expected.iter()) {
            assert!((a - b).abs() <= 1, "chunked {} vs whole {}", a, b);
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut rs = StreamResampler::new(48000, 16000);
        let _ = rs.process(&vec![500i16; 480]);
        rs.reset();
        let out = rs.process(&vec![500i16; 480]);
        // After reset the first output is the first input sample again
        assert_eq!(out.first(), Some(&500));
    }
}
