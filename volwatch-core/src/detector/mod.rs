//! `ThresholdDetector`: polls a volume sampler and tracks threshold state.
//!
//! ## Lifecycle
//!
//! ```text
//! ThresholdDetector::new()   → threshold from config, or calibrated now
//!     └─► run()              → startup delay, drain stale audio,
//!                              poll() until deadline / sampler exhausted / error
//! ```
//!
//! The detector owns its sampler, so owning a detector built on a
//! `CaptureSampler` owns the microphone. Dropping it releases the device.

pub mod calibrate;
pub mod machine;

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    audio::{device::DeviceSelector, format::AudioFormat, CaptureOptions},
    clock::{Clock, SystemClock},
    error::{Result, VolwatchError},
    events::{DetectorEvent, EventSink},
    sampler::{SampleShape, VolumeSampler},
};
use calibrate::{calibrate, Calibration, CalibrationConfig};
use machine::{ThresholdState, Transition};

/// How a volume reading is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    /// Condition holds when `volume < threshold` (detecting quiet).
    #[default]
    Lt,
    /// Condition holds when `volume > threshold` (detecting noise).
    Gt,
}

impl Comparator {
    pub fn apply(self, volume: f64, threshold: f64) -> bool {
        match self {
            Comparator::Lt => volume < threshold,
            Comparator::Gt => volume > threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Lt => write!(f, "lt"),
            Comparator::Gt => write!(f, "gt"),
        }
    }
}

impl FromStr for Comparator {
    type Err = VolwatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lt" => Ok(Comparator::Lt),
            "gt" => Ok(Comparator::Gt),
            other => Err(VolwatchError::InvalidOperator(other.to_string())),
        }
    }
}

/// Which polling behaviour the detector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Report only whether each reading satisfies the comparison.
    Simple,
    /// Track below-threshold runs and alert after the time threshold.
    #[default]
    Timed,
}

impl fmt::Display for DetectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorMode::Simple => write!(f, "simple"),
            DetectorMode::Timed => write!(f, "timed"),
        }
    }
}

impl FromStr for DetectorMode {
    type Err = VolwatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(DetectorMode::Simple),
            "timed" => Ok(DetectorMode::Timed),
            other => Err(VolwatchError::InvalidDetector(other.to_string())),
        }
    }
}

/// Configuration for `ThresholdDetector`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Frames per RMS chunk. Default: 512.
    pub chunk: usize,
    /// Integer width the volume is measured at. Default: int16.
    pub format: AudioFormat,
    /// Capture channel count. `None` uses the device default.
    pub channels: Option<u16>,
    /// Volume threshold. `None` calibrates from ambient noise at startup.
    pub volume_threshold: Option<f64>,
    /// How long the condition must hold before alerting. Default: 3.5 s.
    pub time_threshold: Duration,
    /// Audio covered by one reading. Default: 0.25 s.
    pub recording_sample: Duration,
    /// Default: `lt`.
    pub operator: Comparator,
    /// Default: `timed`.
    pub mode: DetectorMode,
    pub calibration: CalibrationConfig,
    /// Pause before the first poll. Default: 1 s.
    pub startup_delay: Duration,
    pub input_device: DeviceSelector,
    /// Fixed hardware buffer size in frames. `None` uses the host default.
    pub frames_per_buffer: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            chunk: 512,
            format: AudioFormat::Int16,
            channels: None,
            volume_threshold: None,
            time_threshold: Duration::from_millis(3500),
            recording_sample: Duration::from_millis(250),
            operator: Comparator::Lt,
            mode: DetectorMode::Timed,
            calibration: CalibrationConfig::default(),
            startup_delay: Duration::from_secs(1),
            input_device: DeviceSelector::Default,
            frames_per_buffer: None,
        }
    }
}

impl DetectorConfig {
    /// Reject values the poll loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk == 0 {
            return Err(VolwatchError::InvalidConfig("chunk must be positive".into()));
        }
        if self.recording_sample.is_zero() {
            return Err(VolwatchError::InvalidConfig(
                "recording sample duration must be positive".into(),
            ));
        }
        if self.channels == Some(0) {
            return Err(VolwatchError::InvalidConfig(
                "channel count must be positive".into(),
            ));
        }
        if let Some(threshold) = self.volume_threshold {
            if !threshold.is_finite() {
                return Err(VolwatchError::InvalidConfig(format!(
                    "volume threshold must be a finite number (got {threshold})"
                )));
            }
        }
        let multiplier = self.calibration.multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(VolwatchError::InvalidConfig(format!(
                "calibration multiplier must be positive (got {multiplier})"
            )));
        }
        if self.volume_threshold.is_none() && self.calibration.duration.is_zero() {
            return Err(VolwatchError::InvalidConfig(
                "calibration duration must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn sample_shape(&self) -> SampleShape {
        SampleShape {
            chunk: self.chunk,
            recording_sample: self.recording_sample,
            format: self.format,
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            device: self.input_device.clone(),
            channels: self.channels,
            frames_per_buffer: self.frames_per_buffer,
        }
    }
}

/// Outcome of one `poll()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub volume: u64,
    /// Whether the reading satisfied the comparison.
    pub below: bool,
    /// Timed mode only.
    pub transition: Option<Transition>,
}

/// Counters returned when `run()` ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub polls: u64,
    pub alerts: u64,
}

pub struct ThresholdDetector<S, C = SystemClock> {
    config: DetectorConfig,
    volume_threshold: f64,
    sampler: S,
    clock: C,
    state: ThresholdState,
}

impl<S: VolumeSampler, C: Clock> ThresholdDetector<S, C> {
    /// Build a detector, calibrating the volume threshold first when the
    /// config does not carry one.
    ///
    /// # Errors
    /// `InvalidConfig` for unusable settings, or any sampler error raised
    /// during calibration.
    pub fn new<E: EventSink + ?Sized>(
        config: DetectorConfig,
        mut sampler: S,
        clock: C,
        sink: &mut E,
    ) -> Result<Self> {
        config.validate()?;
        let volume_threshold = match config.volume_threshold {
            Some(threshold) => threshold,
            None => calibrate(&mut sampler, &clock, &config.calibration, sink)?.threshold,
        };

        info!(
            mode = %config.mode,
            operator = %config.operator,
            volume_threshold,
            time_threshold_secs = config.time_threshold.as_secs_f64(),
            "threshold detector ready"
        );

        Ok(Self {
            config,
            volume_threshold,
            sampler,
            clock,
            state: ThresholdState::Idle,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn volume_threshold(&self) -> f64 {
        self.volume_threshold
    }

    pub fn state(&self) -> ThresholdState {
        self.state
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Re-run calibration and replace the volume threshold.
    pub fn set_volume_threshold<E: EventSink + ?Sized>(
        &mut self,
        sink: &mut E,
    ) -> Result<Calibration> {
        let calibration = calibrate(
            &mut self.sampler,
            &self.clock,
            &self.config.calibration,
            sink,
        )?;
        self.volume_threshold = calibration.threshold;
        Ok(calibration)
    }

    /// Apply the configured comparator between `average` and the threshold.
    pub fn detect_volume_threshold(&self, average: u64) -> bool {
        self.config
            .operator
            .apply(average as f64, self.volume_threshold)
    }

    /// Whether the current below-threshold run has lasted strictly longer
    /// than the time threshold. False when no run is in progress.
    pub fn detect_time_threshold(&self) -> bool {
        self.state
            .time_threshold_exceeded(self.clock.now(), self.config.time_threshold)
    }

    /// Take one reading and advance the detector.
    pub fn poll<E: EventSink + ?Sized>(&mut self, sink: &mut E) -> Result<PollReport> {
        match self.config.mode {
            DetectorMode::Simple => self.poll_simple(sink),
            DetectorMode::Timed => self.poll_timed(sink),
        }
    }

    fn poll_simple<E: EventSink + ?Sized>(&mut self, sink: &mut E) -> Result<PollReport> {
        let volume = self.sampler.sample_volume()?;
        let below = self.detect_volume_threshold(volume);
        debug!(volume, below, "poll");
        sink.emit(DetectorEvent::Level { volume, below });
        Ok(PollReport {
            volume,
            below,
            transition: None,
        })
    }

    fn poll_timed<E: EventSink + ?Sized>(&mut self, sink: &mut E) -> Result<PollReport> {
        let volume = self.sampler.sample_volume()?;
        let below = self.detect_volume_threshold(volume);
        let now = self.clock.now();
        let time_exceeded = self
            .state
            .time_threshold_exceeded(now, self.config.time_threshold);

        let (next, transition) = self.state.step(below, time_exceeded, now);
        debug!(volume, below, time_exceeded, state = ?next, "poll");
        self.state = next;

        sink.emit(DetectorEvent::Volume { volume });
        match transition {
            Some(Transition::RunStarted) => sink.emit(DetectorEvent::RunStarted),
            Some(Transition::ThresholdsMet) => {
                info!(volume, "time and volume thresholds met");
                sink.emit(DetectorEvent::ThresholdsMet);
            }
            Some(Transition::Recovered { elapsed }) => {
                info!(elapsed_secs = elapsed.as_secs_f64(), "threshold run ended");
                sink.emit(DetectorEvent::Recovered {
                    elapsed_secs: elapsed.as_secs_f64(),
                });
            }
            Some(Transition::RunCleared) => sink.emit(DetectorEvent::RunCleared),
            None => {}
        }

        Ok(PollReport {
            volume,
            below,
            transition,
        })
    }

    /// Poll until `deadline` (on the detector's clock) passes or the sampler
    /// is exhausted. Any other error, including one reported by `sink`, ends
    /// the run and is returned.
    pub fn run<E: EventSink + ?Sized>(
        &mut self,
        sink: &mut E,
        deadline: Option<Instant>,
    ) -> Result<RunSummary> {
        if !self.config.startup_delay.is_zero() {
            self.clock.sleep(self.config.startup_delay);
        }
        self.sampler.discard_buffered();
        info!(mode = %self.config.mode, "detector running");

        let mut summary = RunSummary::default();
        loop {
            if deadline.is_some_and(|d| self.clock.now() >= d) {
                info!(polls = summary.polls, "deadline reached");
                break;
            }
            match self.poll(sink) {
                Ok(report) => {
                    summary.polls += 1;
                    if report.transition == Some(Transition::ThresholdsMet) {
                        summary.alerts += 1;
                    }
                    if let Some(e) = sink.take_error() {
                        return Err(e);
                    }
                }
                Err(VolwatchError::Exhausted) => {
                    info!(polls = summary.polls, "sample source exhausted");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }
}
