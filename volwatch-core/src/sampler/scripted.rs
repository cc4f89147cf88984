//! Sampler that replays a fixed list of readings.

use std::collections::VecDeque;
use std::time::Duration;

use super::VolumeSampler;
use crate::{
    clock::ManualClock,
    error::{Result, VolwatchError},
};

/// Returns queued readings in order, then `Exhausted`.
///
/// When attached to a [`ManualClock`] every reading advances it by `step`,
/// standing in for the time a real recording sample would block.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    readings: VecDeque<u64>,
    clock: Option<(ManualClock, Duration)>,
}

impl ScriptedSampler {
    pub fn new(readings: impl IntoIterator<Item = u64>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            clock: None,
        }
    }

    /// Advance `clock` by `step` on every reading.
    pub fn with_clock(mut self, clock: ManualClock, step: Duration) -> Self {
        self.clock = Some((clock, step));
        self
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl VolumeSampler for ScriptedSampler {
    fn sample_volume(&mut self) -> Result<u64> {
        let volume = self.readings.pop_front().ok_or(VolwatchError::Exhausted)?;
        if let Some((clock, step)) = &self.clock {
            clock.advance(*step);
        }
        Ok(volume)
    }
}
