//! Line-oriented rendering of detector events on stdout.
//!
//! Every line is flushed immediately so a parent process reading the pipe
//! sees readings as they happen. A failed write is kept and handed to the
//! detector, which ends the run with it.

use std::io::{self, Write};

use tracing::warn;
use volwatch_core::{DetectorEvent, EventSink, VolwatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct Printer<W: Write> {
    out: W,
    format: OutputFormat,
    error: Option<io::Error>,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            error: None,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

impl<W: Write> EventSink for Printer<W> {
    fn emit(&mut self, event: DetectorEvent) {
        let line = match self.format {
            OutputFormat::Text => render_text(&event),
            OutputFormat::Json => match serde_json::to_string(&event) {
                Ok(json) => Some(json),
                Err(e) => {
                    warn!("failed to serialize event: {e}");
                    None
                }
            },
        };
        let Some(line) = line else {
            return;
        };
        if let Err(e) = self.write_line(&line) {
            if self.error.is_none() {
                warn!("failed to write detector output: {e}");
                self.error = Some(e);
            }
        }
    }

    fn take_error(&mut self) -> Option<VolwatchError> {
        self.error.take().map(VolwatchError::Io)
    }
}

/// Human-readable line for `event`, or `None` for events that print nothing.
pub fn render_text(event: &DetectorEvent) -> Option<String> {
    match event {
        DetectorEvent::Calibrating { seconds } => Some(format!(
            "Sampling volume to reset threshold. Please be silent...\nSampling for {seconds} seconds..."
        )),
        DetectorEvent::CalibrationReading { volume } => Some(format!("current volume is {volume}")),
        DetectorEvent::Calibrated { threshold, .. } => {
            Some(format!("volume threshold set at: {threshold}"))
        }
        DetectorEvent::Volume { volume } => Some(volume.to_string()),
        DetectorEvent::Level { below, .. } => Some(if *below { "0" } else { "1" }.to_string()),
        DetectorEvent::RunStarted => {
            Some("New threshold period, counting down time threshold".to_string())
        }
        DetectorEvent::ThresholdsMet => Some("Time and volume thresholds met!".to_string()),
        DetectorEvent::Recovered { elapsed_secs } => {
            Some(format!("Seconds thresholds were met: {elapsed_secs:.3}"))
        }
        DetectorEvent::RunCleared => None,
    }
}
