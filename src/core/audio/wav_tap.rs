//! Debug WAV sink for model audio.

use std::path::Path;

use crate::errors::{AppError, AppResult};

/// Writes mono PCM16 samples to a WAV file for offline inspection.
///
/// Enabled per session when a recording directory is configured. The
/// file is finalized on `finish` or when the tap is dropped.
pub struct WavTap {
    writer: Option<hound::WavWriter<std::io::BufWriter<std::fs::File>>>,
    path: std::path::PathBuf,
}

impl WavTap {
    /// Create a WAV file at `path` for audio at `sample_rate` Hz.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> AppResult<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = path.as_ref().to_path_buf();
        let writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| AppError::Internal(format!("failed to create WAV file: {}", e)))?;
        Ok(Self {
            writer: Some(writer),
            path,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append samples to the file.
    pub fn write_samples(&mut self, samples: &[i16]) -> AppResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            for &s in samples {
                writer
                    .write_sample(s)
                    .map_err(|e| AppError::Internal(format!("WAV write failed: {}", e)))?;
            }
        }
        Ok(())
    }

    /// Finalize the WAV header. Idempotent.
    pub fn finish(&mut self) -> AppResult<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| AppError::Internal(format!("WAV finalize failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for WavTap {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            let _ = writer.finalize();
        }
    }
}

impl std::fmt::Debug for WavTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavTap")
            .field("path", &self.path)
            .field("open", &self.writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_readable_wav() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tap.wav");

        let mut tap = WavTap::create(&path, 24000).expect("create tap");
        let samples: Vec<i16> = (0..2400).map(|i| (i % 100) as i16).collect();
        tap.write_samples(&samples).expect("write");
        tap.finish().expect("finish");

        let mut reader = hound::WavReader::open(&path).expect("open wav");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn test_finalizes_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dropped.wav");
        {
            let mut tap = WavTap::create(&path, 16000).expect("create tap");
            tap.write_samples(&[1, 2, 3]).expect("write");
        }
        let mut reader = hound::WavReader::open(&path).expect("open wav");
        assert_eq!(reader.samples::<i16>().count(), 3);
    }
}
