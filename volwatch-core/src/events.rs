//! Events emitted by the detector on every poll and during calibration.
//!
//! Hosts render them however they like; the CLI prints them as text lines
//! or as JSON objects tagged by `"event"`.

use serde::{Deserialize, Serialize};

use crate::error::VolwatchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DetectorEvent {
    /// Calibration started; the room should be quiet for `seconds`.
    Calibrating { seconds: f64 },
    /// One ambient reading taken during calibration.
    CalibrationReading { volume: u64 },
    /// Calibration finished and the volume threshold is now set.
    Calibrated { threshold: f64, readings: usize },
    /// Average volume of one timed-mode poll.
    Volume { volume: u64 },
    /// Simple-mode result: whether the volume satisfied the comparison.
    Level { volume: u64, below: bool },
    /// A below-threshold run began; the time threshold is counting down.
    RunStarted,
    /// Volume and time thresholds were both met.
    ThresholdsMet,
    /// Volume came back after an alert; `elapsed_secs` since the run began.
    Recovered { elapsed_secs: f64 },
    /// A below-threshold run ended before the time threshold was reached.
    RunCleared,
}

/// Receiver of detector events.
///
/// `emit` does not fail. A sink that loses output (e.g. a closed pipe)
/// keeps the error and hands it over from `take_error`, which the detector
/// checks after every reading.
pub trait EventSink {
    fn emit(&mut self, event: DetectorEvent);

    /// First delivery failure since the last call, if any.
    fn take_error(&mut self) -> Option<VolwatchError> {
        None
    }
}

impl EventSink for Vec<DetectorEvent> {
    fn emit(&mut self, event: DetectorEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: DetectorEvent) {
        (**self).emit(event);
    }

    fn take_error(&mut self) -> Option<VolwatchError> {
        (**self).take_error()
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: DetectorEvent) {}
}
