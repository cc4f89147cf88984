//! Command-line arguments.
//!
//! Positional arguments keep the historical
//! `volwatch [detector] [volume_threshold] [time_threshold] [operator]` shape;
//! everything else is a flag.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use volwatch_core::{AudioFormat, Comparator, DetectorMode};

#[derive(Debug, Parser, Clone, Default)]
#[command(
    name = "volwatch",
    about = "Watch microphone volume and report when it stays past a threshold",
    version
)]
pub struct Cli {
    /// Detector mode: simple or timed
    #[arg(value_parser = parse_detector)]
    pub detector: Option<DetectorMode>,

    /// Volume threshold (calibrated from ambient noise when omitted)
    #[arg(value_parser = parse_volume_threshold)]
    pub volume_threshold: Option<f64>,

    /// Seconds the condition must hold before alerting
    #[arg(value_parser = parse_time_threshold)]
    pub time_threshold: Option<f64>,

    /// Comparison against the threshold: lt (quiet) or gt (noise)
    #[arg(value_parser = parse_operator)]
    pub operator: Option<Comparator>,

    /// JSON settings file (defaults to the per-user settings path if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input device name or index (see --list-devices)
    #[arg(long)]
    pub device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-devices", default_value_t = false)]
    pub list_devices: bool,

    /// Replay a WAV file instead of listening to the microphone
    #[arg(long, value_name = "FILE")]
    pub wav: Option<PathBuf>,

    /// Stop after this many seconds of polling
    #[arg(long, value_name = "SECS", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Print events as JSON lines instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Frames per RMS chunk
    #[arg(long, value_parser = parse_chunk)]
    pub chunk: Option<usize>,

    /// Integer width the volume is measured at: int8, int16 or int32
    #[arg(long, value_parser = parse_format)]
    pub format: Option<AudioFormat>,

    /// Capture channel count (device default when omitted)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub channels: Option<u16>,

    /// Seconds of audio per reading
    #[arg(long = "sample-secs", value_parser = parse_positive_seconds)]
    pub sample_secs: Option<f64>,

    /// Seconds of ambient sampling when calibrating
    #[arg(long = "calibrate-secs", value_parser = parse_positive_seconds)]
    pub calibrate_secs: Option<f64>,

    /// Calibrated threshold = mean ambient volume × multiplier
    #[arg(long, value_parser = parse_multiplier)]
    pub multiplier: Option<f64>,
}

fn parse_detector(raw: &str) -> Result<DetectorMode, String> {
    raw.parse()
        .map_err(|_| "Please indicate whether detector is simple or timed".to_string())
}

fn parse_volume_threshold(raw: &str) -> Result<f64, String> {
    parse_number(raw).ok_or_else(|| "Please provide a number for the volume threshold".into())
}

fn parse_time_threshold(raw: &str) -> Result<f64, String> {
    parse_number(raw)
        .filter(|secs| Duration::try_from_secs_f64(*secs).is_ok())
        .ok_or_else(|| "Please provide a number for the time threshold".into())
}

fn parse_operator(raw: &str) -> Result<Comparator, String> {
    raw.parse().map_err(|_| "No valid operator given (use lt or gt)".to_string())
}

fn parse_format(raw: &str) -> Result<AudioFormat, String> {
    raw.parse().map_err(|e: volwatch_core::VolwatchError| e.to_string())
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    parse_number(raw)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| format!("expected a non-negative number of seconds, got '{raw}'"))
}

fn parse_positive_seconds(raw: &str) -> Result<f64, String> {
    parse_duration(raw)
        .ok()
        .filter(|d| !d.is_zero())
        .map(|d| d.as_secs_f64())
        .ok_or_else(|| format!("expected a positive number of seconds, got '{raw}'"))
}

fn parse_chunk(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|frames| *frames > 0)
        .ok_or_else(|| format!("expected a positive number of frames, got '{raw}'"))
}

fn parse_multiplier(raw: &str) -> Result<f64, String> {
    parse_number(raw)
        .filter(|m| *m > 0.0)
        .ok_or_else(|| format!("expected a positive multiplier, got '{raw}'"))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
