//! `volwatch`: microphone volume threshold detector.
//!
//! Detector output goes to stdout one line at a time; diagnostics go to
//! stderr through `tracing`.

mod cli;
mod output;
mod settings;

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use tracing::info;
use volwatch_core::{
    audio::device::list_input_devices, detector::RunSummary, CaptureSampler, Clock,
    DetectorConfig, ManualClock, SystemClock, ThresholdDetector, VolumeSampler, WavSampler,
};

use cli::Cli;
use output::{OutputFormat, Printer};

fn main() -> ExitCode {
    // ── Tracing ───────────────────────────────────────────────────────────
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("volwatch=info,volwatch_core=info"));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let stdout = io::stdout();
    ExitCode::from(execute(std::env::args_os(), &mut stdout.lock()))
}

/// Parse `args` and run. Returns the process exit status.
///
/// Detector output and usage messages go to `out`; errors from the run go
/// to stderr.
fn execute<I, T, W>(args: I, out: &mut W) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            // Usage problems are reported on stdout for the parent process.
            let _ = write!(out, "{e}").and_then(|()| out.flush());
            return status;
        }
    };

    match run(cli, out) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("volwatch: {e:#}");
            1
        }
    }
}

fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    if cli.list_devices {
        return print_devices(format, out);
    }

    let settings = settings::resolve(&cli)?;
    let config = settings.to_detector_config()?;
    let mut printer = Printer::new(out, format);

    let summary = match &cli.wav {
        Some(path) => {
            let clock = ManualClock::new();
            let sampler = WavSampler::open(path, config.sample_shape())
                .with_context(|| format!("opening {}", path.display()))?
                .with_clock(clock.clone());
            drive(config, sampler, clock, &mut printer, cli.duration)?
        }
        None => {
            let sampler = CaptureSampler::open(&config.capture_options(), config.sample_shape())
                .context("opening audio input")?;
            drive(config, sampler, SystemClock, &mut printer, cli.duration)?
        }
    };

    info!(polls = summary.polls, alerts = summary.alerts, "volwatch finished");
    Ok(())
}

/// Build the detector (calibrating if needed) and poll until done.
///
/// The sampler, and with it any audio device, is released when this returns.
fn drive<S: VolumeSampler, C: Clock, W: Write>(
    config: DetectorConfig,
    sampler: S,
    clock: C,
    printer: &mut Printer<W>,
    duration: Option<Duration>,
) -> Result<RunSummary> {
    let mut detector = ThresholdDetector::new(config, sampler, clock, &mut *printer)?;
    let startup_delay = detector.config().startup_delay;
    // A deadline past what `Instant` can hold is no deadline.
    let deadline = duration.and_then(|d| {
        detector
            .clock()
            .now()
            .checked_add(startup_delay)?
            .checked_add(d)
    });
    Ok(detector.run(printer, deadline)?)
}

fn print_devices<W: Write>(format: OutputFormat, out: &mut W) -> Result<()> {
    let devices = list_input_devices()?;
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&devices)?)?,
        OutputFormat::Text => {
            if devices.is_empty() {
                writeln!(out, "No audio input devices found.")?;
            }
            for device in devices {
                writeln!(
                    out,
                    "[{}] {} ({} ch, {} Hz){}",
                    device.index,
                    device.name,
                    device.max_input_channels,
                    device.default_sample_rate,
                    if device.is_default { " [default]" } else { "" }
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn temp_path(name: &str, ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("volwatch-main-{name}-{}.{ext}", std::process::id()))
    }

    /// 1 kHz mono: 1 s loud, 1 s silent, 0.4 s loud.
    fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 1_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let square = |i: usize| if i % 2 == 0 { 8_000i16 } else { -8_000 };
        for i in 0..1_000 {
            writer.write_sample(square(i)).unwrap();
        }
        for _ in 0..1_000 {
            writer.write_sample(0i16).unwrap();
        }
        for i in 0..400 {
            writer.write_sample(square(i)).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Run against a WAV file with an empty settings file, so the user's
    /// own settings never leak in.
    fn run_wav(name: &str, extra: &[&str]) -> (u8, String) {
        let wav = temp_path(name, "wav");
        let config = temp_path(name, "json");
        write_wav(&wav);
        fs::write(&config, "{}").unwrap();

        let mut args: Vec<String> = ["volwatch", "timed", "1000", "0.5", "lt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(
            [
                "--config",
                config.to_str().unwrap(),
                "--wav",
                wav.to_str().unwrap(),
                "--chunk",
                "100",
                "--sample-secs",
                "0.2",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.extend(extra.iter().map(|s| s.to_string()));

        let mut out = Vec::new();
        let status = execute(args, &mut out);
        let _ = fs::remove_file(&wav);
        let _ = fs::remove_file(&config);
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn usage_errors_print_to_stdout_and_exit_1() {
        let mut out = Vec::new();
        assert_eq!(execute(["volwatch", "fancy"], &mut out), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Please indicate whether detector is simple or timed"));
    }

    #[test]
    fn help_exits_0() {
        let mut out = Vec::new();
        assert_eq!(execute(["volwatch", "--help"], &mut out), 0);
        assert!(String::from_utf8(out).unwrap().contains("Usage"));
    }

    #[test]
    fn explicit_config_that_fails_to_load_exits_1() {
        let missing = temp_path("no-such-settings", "json");
        let mut out = Vec::new();
        let status = execute(
            ["volwatch", "--config", missing.to_str().unwrap()],
            &mut out,
        );
        assert_eq!(status, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn wav_run_prints_volumes_and_status_lines() {
        let (status, out) = run_wav("timed", &[]);
        assert_eq!(status, 0);

        let mut expected = vec!["8000"; 5];
        expected.extend([
            "0",
            "New threshold period, counting down time threshold",
            "0",
            "0",
            "0",
            "Time and volume thresholds met!",
            "0",
            "8000",
            "Seconds thresholds were met: 1.000",
            "8000",
        ]);
        assert_eq!(out.lines().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn duration_bounds_the_run_in_audio_time() {
        let (status, out) = run_wav("duration", &["--duration", "0.5", "--json"]);
        assert_eq!(status, 0);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec![r#"{"event":"volume","volume":8000}"#; 3]);
    }

    #[test]
    fn closed_stdout_exits_1() {
        struct ClosedPipe;
        impl Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
        }

        let wav = temp_path("closed", "wav");
        let config = temp_path("closed", "json");
        write_wav(&wav);
        fs::write(&config, "{}").unwrap();
        let status = execute(
            [
                "volwatch",
                "simple",
                "1000",
                "--config",
                config.to_str().unwrap(),
                "--wav",
                wav.to_str().unwrap(),
            ],
            &mut ClosedPipe,
        );
        let _ = fs::remove_file(&wav);
        let _ = fs::remove_file(&config);
        assert_eq!(status, 1);
    }
}
