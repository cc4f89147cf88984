//! Detector settings: JSON file, then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use volwatch_core::{
    AudioFormat, CalibrationConfig, Comparator, DetectorConfig, DetectorMode, DeviceSelector,
};

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Settings {
    pub detector: DetectorMode,
    pub volume_threshold: Option<f64>,
    pub time_threshold_secs: f64,
    pub operator: Comparator,
    pub chunk: usize,
    pub format: AudioFormat,
    pub channels: Option<u16>,
    pub recording_sample_secs: f64,
    pub calibration_secs: f64,
    pub calibration_multiplier: f64,
    pub startup_delay_secs: f64,
    pub input_device: Option<String>,
    pub frames_per_buffer: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detector: DetectorMode::Timed,
            volume_threshold: None,
            time_threshold_secs: 3.5,
            operator: Comparator::Lt,
            chunk: 512,
            format: AudioFormat::Int16,
            channels: None,
            recording_sample_secs: 0.25,
            calibration_secs: 5.0,
            calibration_multiplier: 2.0,
            startup_delay_secs: 1.0,
            input_device: None,
            frames_per_buffer: None,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.volume_threshold = self.volume_threshold.filter(|t| t.is_finite());
        self.time_threshold_secs = finite_or(self.time_threshold_secs, 3.5).clamp(0.0, 1e9);
        self.chunk = self.chunk.clamp(16, 1 << 16);
        self.channels = self.channels.filter(|c| *c > 0);
        self.recording_sample_secs = finite_or(self.recording_sample_secs, 0.25).clamp(0.01, 10.0);
        self.calibration_secs = finite_or(self.calibration_secs, 5.0).clamp(0.25, 120.0);
        self.calibration_multiplier = finite_or(self.calibration_multiplier, 2.0).clamp(0.1, 100.0);
        self.startup_delay_secs = finite_or(self.startup_delay_secs, 1.0).clamp(0.0, 30.0);
        self.input_device = self
            .input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.frames_per_buffer = self.frames_per_buffer.filter(|f| *f > 0);
    }

    /// Overlay values given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(detector) = cli.detector {
            self.detector = detector;
        }
        if let Some(threshold) = cli.volume_threshold {
            self.volume_threshold = Some(threshold);
        }
        if let Some(secs) = cli.time_threshold {
            self.time_threshold_secs = secs;
        }
        if let Some(operator) = cli.operator {
            self.operator = operator;
        }
        if let Some(device) = &cli.device {
            self.input_device = Some(device.clone());
        }
        if let Some(chunk) = cli.chunk {
            self.chunk = chunk;
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        if let Some(channels) = cli.channels {
            self.channels = Some(channels);
        }
        if let Some(secs) = cli.sample_secs {
            self.recording_sample_secs = secs;
        }
        if let Some(secs) = cli.calibrate_secs {
            self.calibration_secs = secs;
        }
        if let Some(multiplier) = cli.multiplier {
            self.calibration_multiplier = multiplier;
        }
    }

    /// Build and validate the detector config. Values are taken as they are;
    /// out-of-range ones are errors.
    pub fn to_detector_config(&self) -> Result<DetectorConfig> {
        let input_device = match &self.input_device {
            Some(raw) => raw.parse::<DeviceSelector>()?,
            None => DeviceSelector::Default,
        };
        let config = DetectorConfig {
            chunk: self.chunk,
            format: self.format,
            channels: self.channels,
            volume_threshold: self.volume_threshold,
            time_threshold: seconds("time threshold", self.time_threshold_secs)?,
            recording_sample: seconds("recording sample", self.recording_sample_secs)?,
            operator: self.operator,
            mode: self.detector,
            calibration: CalibrationConfig {
                duration: seconds("calibration", self.calibration_secs)?,
                multiplier: self.calibration_multiplier,
            },
            startup_delay: seconds("startup delay", self.startup_delay_secs)?,
            input_device,
            frames_per_buffer: self.frames_per_buffer,
        };
        config.validate()?;
        Ok(config)
    }
}

fn seconds(what: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{what} must be a non-negative number of seconds (got {secs})"))
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("volwatch")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("volwatch")
            .join("settings.json")
    }
}

/// Read and normalize a settings file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading settings file {}", path.display()))?;
    let mut settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("parsing settings file {}", path.display()))?;
    settings.normalize();
    Ok(settings)
}

/// Settings for this invocation.
///
/// An explicit `--config` must load. The per-user default file is optional:
/// missing is silent, malformed is a warning and defaults are used. File
/// values are normalized; command-line values are not, so a bad flag fails
/// in `to_detector_config`.
pub fn resolve(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => {
            let path = default_settings_path();
            if path.exists() {
                load_settings(&path).unwrap_or_else(|e| {
                    warn!("ignoring settings file: {e:#}");
                    Settings::default()
                })
            } else {
                Settings::default()
            }
        }
    };
    settings.apply_cli(cli);
    if cli.wav.is_some() {
        settings.startup_delay_secs = 0.0;
    }
    debug!(?settings, "settings resolved");
    Ok(settings)
}
