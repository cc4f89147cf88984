//! WAV file replay sampler.
//!
//! Measures a recording with the same chunking and RMS rules as the live
//! microphone, as fast as the file can be read. Attach a [`ManualClock`] so
//! the time threshold is judged in audio time rather than wall time.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

use tracing::info;

use super::{average_volume, SampleShape, VolumeSampler};
use crate::{
    buffering::chunk,
    clock::ManualClock,
    error::{Result, VolwatchError},
};

pub struct WavSampler {
    /// Interleaved samples normalised to [-1.0, 1.0].
    samples: Vec<f32>,
    pos: usize,
    channels: u16,
    sample_rate: u32,
    shape: SampleShape,
    chunks_per_sample: usize,
    clock: Option<ManualClock>,
}

impl WavSampler {
    pub fn open(path: &Path, shape: SampleShape) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let sampler = Self::from_reader(reader, shape)?;
        info!(
            path = %path.display(),
            sample_rate = sampler.sample_rate,
            channels = sampler.channels,
            seconds = sampler.duration().as_secs_f64(),
            "WAV sampler ready"
        );
        Ok(sampler)
    }

    pub fn from_reader<R: Read>(reader: R, shape: SampleShape) -> Result<Self> {
        let mut reader = hound::WavReader::new(reader)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(VolwatchError::AudioStream(format!(
                        "unsupported WAV bit depth: {}",
                        spec.bits_per_sample
                    )));
                }
                let scale = (1u64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v as f64 / scale) as f32))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(Self {
            samples,
            pos: 0,
            channels: spec.channels.max(1),
            sample_rate: spec.sample_rate,
            chunks_per_sample: shape.chunks_per_sample(spec.sample_rate),
            shape,
            clock: None,
        })
    }

    /// Advance `clock` by the audio duration of every reading.
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Total length of the recording.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }

    fn chunk_len(&self) -> usize {
        self.shape.chunk.max(1) * self.channels as usize
    }
}

impl VolumeSampler for WavSampler {
    fn sample_volume(&mut self) -> Result<u64> {
        let chunk_len = self.chunk_len();
        let needed = chunk_len * self.chunks_per_sample;
        if self.samples.len() - self.pos < needed {
            return Err(VolwatchError::Exhausted);
        }

        let window = &self.samples[self.pos..self.pos + needed];
        let volumes: Vec<u64> = window
            .chunks_exact(chunk_len)
            .map(|c| chunk::rms(c, self.shape.format))
            .collect();
        self.pos += needed;

        if let Some(clock) = &self.clock {
            let frames = needed / self.channels as usize;
            clock.advance(Duration::from_secs_f64(
                frames as f64 / self.sample_rate.max(1) as f64,
            ));
        }

        Ok(average_volume(&volumes))
    }
}
