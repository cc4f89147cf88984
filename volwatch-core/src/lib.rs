//! # volwatch-core
//!
//! Microphone volume threshold detection.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → AudioCapture → SPSC RingBuffer → CaptureSampler ─┐
//! WAV file ──────────────────────────────────→ WavSampler ──────┤
//!                                                               │ average RMS
//!                                                               ▼
//!                                    ThresholdDetector::poll (Idle/BelowPending/Alerted)
//!                                                               │
//!                                                        EventSink (DetectorEvent)
//! ```
//!
//! The audio callback only copies into the ring buffer. All measurement and
//! state tracking happen on the single polling thread.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod clock;
pub mod detector;
pub mod error;
pub mod events;
pub mod sampler;

// Convenience re-exports for downstream crates
pub use audio::{device::DeviceSelector, format::AudioFormat};
pub use clock::{Clock, ManualClock, SystemClock};
pub use detector::{
    calibrate::CalibrationConfig, machine::ThresholdState, Comparator, DetectorConfig,
    DetectorMode, ThresholdDetector,
};
pub use error::VolwatchError;
pub use events::{DetectorEvent, EventSink};
pub use sampler::{CaptureSampler, ScriptedSampler, VolumeSampler, WavSampler};
