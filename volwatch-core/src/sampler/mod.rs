//! Volume samplers.
//!
//! The `VolumeSampler` trait is the boundary between the detector's state
//! machine and wherever audio comes from: the live microphone
//! (`CaptureSampler`), a WAV file (`WavSampler`) or a fixed list of
//! readings (`ScriptedSampler`).
//!
//! ## Measurement
//!
//! One recording sample is split into `chunks_per_sample` chunks of `chunk`
//! frames. Each chunk is reduced to its integer RMS and the sample's volume
//! is the integer mean of those values.

pub mod capture;
pub mod scripted;
pub mod wav;

pub use capture::CaptureSampler;
pub use scripted::ScriptedSampler;
pub use wav::WavSampler;

use std::time::Duration;

use crate::{audio::format::AudioFormat, error::Result};

/// Source of averaged volume readings.
pub trait VolumeSampler {
    /// Block for one recording sample and return its average volume.
    ///
    /// # Errors
    /// `VolwatchError::Exhausted` when a finite source has no full sample
    /// left; any other error is fatal to the poll loop.
    fn sample_volume(&mut self) -> Result<u64>;

    /// Throw away audio buffered before the first poll.
    fn discard_buffered(&mut self) {}
}

/// How much audio one reading covers and how it is measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleShape {
    /// Frames per RMS chunk.
    pub chunk: usize,
    /// Length of one recording sample.
    pub recording_sample: Duration,
    /// Integer width the RMS is reported at.
    pub format: AudioFormat,
}

impl Default for SampleShape {
    fn default() -> Self {
        Self {
            chunk: 512,
            recording_sample: Duration::from_millis(250),
            format: AudioFormat::Int16,
        }
    }
}

impl SampleShape {
    /// Number of chunks read per recording sample at `sample_rate`, at least one.
    pub fn chunks_per_sample(&self, sample_rate: u32) -> usize {
        let chunk = self.chunk.max(1) as f64;
        let n = (sample_rate as f64 / chunk * self.recording_sample.as_secs_f64()) as usize;
        n.max(1)
    }
}

/// Integer mean of per-chunk RMS values; 0 for no chunks.
pub fn average_volume(chunk_volumes: &[u64]) -> u64 {
    if chunk_volumes.is_empty() {
        return 0;
    }
    let sum: u128 = chunk_volumes.iter().map(|v| *v as u128).sum();
    (sum / chunk_volumes.len() as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_per_sample_truncates() {
        let shape = SampleShape::default();
        // 44100 / 512 * 0.25 = 21.53
        assert_eq!(shape.chunks_per_sample(44_100), 21);
        // 48000 / 512 * 0.25 = 23.43
        assert_eq!(shape.chunks_per_sample(48_000), 23);
    }

    #[test]
    fn chunks_per_sample_is_never_zero() {
        let shape = SampleShape {
            chunk: 4096,
            recording_sample: Duration::from_millis(10),
            format: AudioFormat::Int16,
        };
        assert_eq!(shape.chunks_per_sample(8_000), 1);
    }

    #[test]
    fn average_volume_floors() {
        assert_eq!(average_volume(&[10, 20, 31]), 20);
        assert_eq!(average_volume(&[]), 0);
        assert_eq!(average_volume(&[u64::MAX, u64::MAX]), u64::MAX);
    }
}
