//! Ambient-noise calibration of the volume threshold.
//!
//! Samples for a fixed duration and sets the threshold to the mean reading
//! times a multiplier. A heuristic: it assumes the room is quiet while it
//! runs.

use std::time::Duration;

use tracing::info;

use crate::{
    clock::Clock,
    error::{Result, VolwatchError},
    events::{DetectorEvent, EventSink},
    sampler::VolumeSampler,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    /// How long to sample ambient volume. Default: 5 s.
    pub duration: Duration,
    /// Threshold = mean reading × multiplier. Default: 2.
    pub multiplier: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Result of a calibration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub threshold: f64,
    pub readings: Vec<u64>,
}

/// `mean(readings) * multiplier`.
///
/// # Errors
/// `VolwatchError::EmptyCalibration` for an empty slice.
pub fn threshold_from_readings(readings: &[u64], multiplier: f64) -> Result<f64> {
    if readings.is_empty() {
        return Err(VolwatchError::EmptyCalibration);
    }
    let sum: f64 = readings.iter().map(|v| *v as f64).sum();
    Ok(sum / readings.len() as f64 * multiplier)
}

/// Sample until `config.duration` has elapsed on `clock` and derive a threshold.
///
/// A finite sampler running dry ends calibration early; it is only an error
/// if no reading was taken at all.
pub fn calibrate<S, C, E>(
    sampler: &mut S,
    clock: &C,
    config: &CalibrationConfig,
    sink: &mut E,
) -> Result<Calibration>
where
    S: VolumeSampler + ?Sized,
    C: Clock + ?Sized,
    E: EventSink + ?Sized,
{
    sink.emit(DetectorEvent::Calibrating {
        seconds: config.duration.as_secs_f64(),
    });
    info!(seconds = config.duration.as_secs_f64(), "sampling ambient volume");

    let start = clock.now();
    let mut readings = Vec::new();
    while clock.now().saturating_duration_since(start) < config.duration {
        match sampler.sample_volume() {
            Ok(volume) => {
                sink.emit(DetectorEvent::CalibrationReading { volume });
                if let Some(e) = sink.take_error() {
                    return Err(e);
                }
                readings.push(volume);
            }
            Err(VolwatchError::Exhausted) if !readings.is_empty() => break,
            Err(VolwatchError::Exhausted) => return Err(VolwatchError::EmptyCalibration),
            Err(e) => return Err(e),
        }
    }

    let threshold = threshold_from_readings(&readings, config.multiplier)?;
    info!(threshold, readings = readings.len(), "volume threshold calibrated");
    sink.emit(DetectorEvent::Calibrated {
        threshold,
        readings: readings.len(),
    });

    Ok(Calibration {
        threshold,
        readings,
    })
}
