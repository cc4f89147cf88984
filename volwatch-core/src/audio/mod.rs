//! Audio capture via cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread. It **must not** block
//! on a lock or perform I/O. It writes interleaved f32 samples straight into
//! an SPSC ring buffer producer whose `push_slice` is lock-free. When the
//! ring is full the overflow is counted and dropped; the poll loop keeps
//! going.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `AudioCapture` must be created and dropped on the same thread,
//! which the single-threaded poll loop guarantees.

pub mod device;
pub mod format;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use crate::{
    buffering::AudioProducer,
    error::{Result, VolwatchError},
};
use device::DeviceSelector;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tracing::info;

#[cfg(feature = "audio-cpal")]
use crate::buffering::Producer;
#[cfg(feature = "audio-cpal")]
use tracing::error;

/// How the input stream should be opened.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Device to open.
    pub device: DeviceSelector,
    /// Channel count; `None` uses the device's default input channels.
    pub channels: Option<u16>,
    /// Fixed hardware buffer size in frames; `None` uses the host default.
    pub frames_per_buffer: Option<u32>,
}

/// Handle to an active audio capture stream.
///
/// Owning this value owns the input device: dropping it stops the callback
/// and closes the stream.
///
/// **Not `Send`**: `cpal::Stream` is bound to its creation thread on Windows/macOS.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag. Set to `false` to signal the callback to no-op.
    running: Arc<AtomicBool>,
    /// Set by the cpal error callback.
    failed: Arc<AtomicBool>,
    /// Samples discarded because the ring buffer was full.
    dropped: Arc<AtomicU64>,
    /// Actual capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
    /// Interleaved channel count of the stream.
    pub channels: u16,
    /// Name of the opened device.
    pub device_name: String,
}

impl AudioCapture {
    /// Open an input device and push interleaved f32 PCM into `producer`.
    ///
    /// # Errors
    /// Returns `VolwatchError::NoDefaultInputDevice` / `DeviceNotFound` when no
    /// matching microphone is available, or `VolwatchError::AudioStream` if
    /// cpal fails to build or start the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open(producer: AudioProducer, options: &CaptureOptions) -> Result<Self> {
        let host = cpal::default_host();
        let device = device::resolve_input_device(&host, &options.device)?;
        let device_name = device.name().unwrap_or_default();

        info!(device = device_name.as_str(), selector = %options.device, "opening input device");

        let supported = device
            .default_input_config()
            .map_err(|e| VolwatchError::AudioDevice(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = options.channels.unwrap_or_else(|| supported.channels());

        info!(sample_rate, channels, format = ?supported.sample_format(), "audio config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: match options.frames_per_buffer {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };

        let running = Arc::new(AtomicBool::new(true));
        let failed = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));
        let shared = CallbackShared {
            running: Arc::clone(&running),
            failed: Arc::clone(&failed),
            dropped: Arc::clone(&dropped),
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, producer, shared, |s| s),
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, producer, shared, |s| s as f32 / 32768.0)
            }
            SampleFormat::I32 => build_stream::<i32>(&device, &config, producer, shared, |s| {
                (s as f64 / 2_147_483_648.0) as f32
            }),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, producer, shared, |s| {
                (s as f32 - 32768.0) / 32768.0
            }),
            SampleFormat::U8 => build_stream::<u8>(&device, &config, producer, shared, |s| {
                (s as f32 - 128.0) / 128.0
            }),
            fmt => {
                return Err(VolwatchError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| VolwatchError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| VolwatchError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            failed,
            dropped,
            sample_rate,
            channels,
            device_name,
        })
    }

    /// Whether the backend reported a stream error (e.g. device unplugged).
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Total samples dropped because the ring buffer was full.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open(_producer: AudioProducer, _options: &CaptureOptions) -> Result<Self> {
        Err(VolwatchError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
        info!(
            device = self.device_name.as_str(),
            dropped_samples = self.dropped_samples(),
            "audio capture released"
        );
    }
}

#[cfg(feature = "audio-cpal")]
struct CallbackShared {
    running: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

#[cfg(feature = "audio-cpal")]
fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: AudioProducer,
    shared: CallbackShared,
    to_f32: fn(T) -> f32,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let CallbackShared {
        running,
        failed,
        dropped,
    } = shared;
    let mut scratch: Vec<f32> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _info| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            scratch.resize(data.len(), 0.0);
            for (dst, src) in scratch.iter_mut().zip(data.iter()) {
                *dst = to_f32(*src);
            }
            let written = producer.push_slice(&scratch);
            if written < scratch.len() {
                dropped.fetch_add((scratch.len() - written) as u64, Ordering::Relaxed);
            }
        },
        move |err| {
            error!("audio stream error: {err}");
            failed.store(true, Ordering::Release);
        },
        None,
    )
}
