//! Live microphone sampler.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{average_volume, SampleShape, VolumeSampler};
use crate::{
    audio::{AudioCapture, CaptureOptions},
    buffering::{chunk, create_audio_ring, AudioConsumer, Consumer},
    error::{Result, VolwatchError},
};

/// Sleep between ring polls while waiting for the callback to deliver audio.
const EMPTY_SLEEP: Duration = Duration::from_millis(2);

/// Extra slack on top of one chunk's duration before a read counts as stalled.
const STALL_GRACE: Duration = Duration::from_secs(2);

/// Reads recording samples from an owned [`AudioCapture`].
///
/// The capture (and with it the input device) is released when the sampler
/// is dropped.
pub struct CaptureSampler {
    capture: AudioCapture,
    consumer: AudioConsumer,
    shape: SampleShape,
    chunks_per_sample: usize,
    buf: Vec<f32>,
    last_dropped: u64,
}

impl CaptureSampler {
    /// Open the input device described by `options` and start capturing.
    pub fn open(options: &CaptureOptions, shape: SampleShape) -> Result<Self> {
        let (producer, consumer) = create_audio_ring();
        let capture = AudioCapture::open(producer, options)?;
        let chunks_per_sample = shape.chunks_per_sample(capture.sample_rate);
        let buf = vec![0.0; shape.chunk.max(1) * capture.channels as usize];

        info!(
            device = capture.device_name.as_str(),
            chunk = shape.chunk,
            chunks_per_sample,
            "microphone sampler ready"
        );

        Ok(Self {
            capture,
            consumer,
            shape,
            chunks_per_sample,
            buf,
            last_dropped: 0,
        })
    }

    fn stall_timeout(&self) -> Duration {
        let chunk_secs = self.shape.chunk as f64 / self.capture.sample_rate.max(1) as f64;
        Duration::from_secs_f64(chunk_secs) + STALL_GRACE
    }

    /// Fill `buf` with exactly one chunk of interleaved samples.
    fn read_chunk(&mut self) -> Result<()> {
        let timeout = self.stall_timeout();
        let started = Instant::now();
        let mut filled = 0;

        while filled < self.buf.len() {
            filled += self.consumer.pop_slice(&mut self.buf[filled..]);
            if filled == self.buf.len() {
                break;
            }
            if self.capture.has_failed() {
                return Err(VolwatchError::AudioStream("input stream failed".into()));
            }
            let waited = started.elapsed();
            if waited > timeout {
                return Err(VolwatchError::CaptureStalled {
                    waited_ms: waited.as_millis() as u64,
                });
            }
            std::thread::sleep(EMPTY_SLEEP);
        }
        Ok(())
    }
}

impl VolumeSampler for CaptureSampler {
    fn sample_volume(&mut self) -> Result<u64> {
        let mut volumes = Vec::with_capacity(self.chunks_per_sample);
        for _ in 0..self.chunks_per_sample {
            self.read_chunk()?;
            volumes.push(chunk::rms(&self.buf, self.shape.format));
        }

        let dropped = self.capture.dropped_samples();
        if dropped > self.last_dropped {
            warn!(
                dropped = dropped - self.last_dropped,
                "ring buffer overflowed, samples dropped"
            );
            self.last_dropped = dropped;
        }

        Ok(average_volume(&volumes))
    }

    fn discard_buffered(&mut self) {
        let discarded = self.consumer.clear();
        debug!(discarded, "discarded buffered audio");
    }
}
