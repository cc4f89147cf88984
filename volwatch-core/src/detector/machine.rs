//! Below/above threshold state machine for timed detection.
//!
//! ```text
//!            below                      below && time exceeded
//!   Idle ───────────────► BelowPending ───────────────────────► Alerted
//!    ▲                         │                                   │
//!    │        above            │                                   │
//!    ├─────────(RunCleared)────┘                                   │
//!    │                               above                         │
//!    └────────────────────────(Recovered { elapsed })──────────────┘
//! ```
//!
//! `since` is the instant the below-threshold run began. It is carried
//! unchanged from `BelowPending` into `Alerted`, so "alerted implies a run
//! is in progress" holds by construction.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdState {
    /// No below-threshold run in progress.
    #[default]
    Idle,
    /// Below threshold since `since`; time threshold not yet met.
    BelowPending { since: Instant },
    /// Both thresholds met for the run that began at `since`.
    Alerted { since: Instant },
}

/// Labelled edge taken by [`ThresholdState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `Idle → BelowPending`
    RunStarted,
    /// `BelowPending → Alerted`
    ThresholdsMet,
    /// `Alerted → Idle`, with the time elapsed since the run began.
    Recovered { elapsed: Duration },
    /// `BelowPending → Idle`
    RunCleared,
}

impl ThresholdState {
    /// True once both thresholds have been met and not yet cleared.
    pub fn alerted(&self) -> bool {
        matches!(self, ThresholdState::Alerted { .. })
    }

    /// True while a below-threshold run is in progress.
    pub fn was_below_threshold(&self) -> bool {
        !matches!(self, ThresholdState::Idle)
    }

    /// Start of the current below-threshold run, if any.
    pub fn threshold_timestamp(&self) -> Option<Instant> {
        match self {
            ThresholdState::Idle => None,
            ThresholdState::BelowPending { since } | ThresholdState::Alerted { since } => {
                Some(*since)
            }
        }
    }

    /// Whether the current run has lasted strictly longer than `threshold`
    /// at `now`. Always false with no run in progress.
    pub fn time_threshold_exceeded(&self, now: Instant, threshold: Duration) -> bool {
        self.threshold_timestamp()
            .map(|since| now.saturating_duration_since(since) > threshold)
            .unwrap_or(false)
    }

    /// Advance by one poll.
    ///
    /// `time_exceeded` must be evaluated against the state *before* this
    /// step (see [`Self::time_threshold_exceeded`]).
    pub fn step(
        self,
        below: bool,
        time_exceeded: bool,
        now: Instant,
    ) -> (Self, Option<Transition>) {
        use ThresholdState::*;

        match (self, below) {
            (Idle, true) => (BelowPending { since: now }, Some(Transition::RunStarted)),
            (Idle, false) => (Idle, None),
            (BelowPending { since }, true) if time_exceeded => {
                (Alerted { since }, Some(Transition::ThresholdsMet))
            }
            (pending @ BelowPending { .. }, true) => (pending, None),
            (BelowPending { .. }, false) => (Idle, Some(Transition::RunCleared)),
            (alerted @ Alerted { .. }, true) => (alerted, None),
            (Alerted { since }, false) => (
                Idle,
                Some(Transition::Recovered {
                    elapsed: now.saturating_duration_since(since),
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(500);

    /// Mirrors one poll of the detector: time check first, then the step.
    fn poll(
        state: ThresholdState,
        below: bool,
        now: Instant,
    ) -> (ThresholdState, Option<Transition>) {
        let exceeded = state.time_threshold_exceeded(now, T);
        state.step(below, exceeded, now)
    }

    #[test]
    fn idle_has_no_timestamp_and_never_exceeds() {
        let state = ThresholdState::Idle;
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert!(!state.alerted());
        assert!(!state.was_below_threshold());
        assert_eq!(state.threshold_timestamp(), None);
        assert!(!state.time_threshold_exceeded(far_future, T));
    }

    #[test]
    fn time_threshold_is_strict() {
        let t0 = Instant::now();
        let state = ThresholdState::BelowPending { since: t0 };
        assert!(!state.time_threshold_exceeded(t0 + T, T));
        assert!(state.time_threshold_exceeded(t0 + T + Duration::from_nanos(1), T));
    }

    #[test]
    fn above_while_idle_stays_idle() {
        let (next, transition) = poll(ThresholdState::Idle, false, Instant::now());
        assert_eq!(next, ThresholdState::Idle);
        assert_eq!(transition, None);
    }

    #[test]
    fn first_below_starts_a_run_without_alerting() {
        let t0 = Instant::now();
        let (next, transition) = poll(ThresholdState::Idle, true, t0);
        assert_eq!(next, ThresholdState::BelowPending { since: t0 });
        assert_eq!(transition, Some(Transition::RunStarted));
        assert!(!next.alerted());
    }

    #[test]
    fn below_before_time_threshold_keeps_pending() {
        let t0 = Instant::now();
        let state = ThresholdState::BelowPending { since: t0 };
        let (next, transition) = poll(state, true, t0 + Duration::from_millis(300));
        assert_eq!(next, state);
        assert_eq!(transition, None);
    }

    #[test]
    fn alert_fires_once_per_run() {
        let t0 = Instant::now();
        let (s1, _) = poll(ThresholdState::Idle, true, t0);
        let (s2, tr2) = poll(s1, true, t0 + Duration::from_secs(1));
        let (s3, tr3) = poll(s2, true, t0 + Duration::from_secs(2));

        assert_eq!(tr2, Some(Transition::ThresholdsMet));
        assert_eq!(s2, ThresholdState::Alerted { since: t0 });
        assert_eq!(tr3, None);
        assert_eq!(s3, s2);
    }

    #[test]
    fn recovery_reports_time_since_run_start() {
        let t0 = Instant::now();
        let state = ThresholdState::Alerted { since: t0 };
        let (next, transition) = poll(state, false, t0 + Duration::from_secs(7));
        assert_eq!(next, ThresholdState::Idle);
        assert_eq!(
            transition,
            Some(Transition::Recovered {
                elapsed: Duration::from_secs(7)
            })
        );
    }

    #[test]
    fn above_before_alert_clears_the_run() {
        let t0 = Instant::now();
        let state = ThresholdState::BelowPending { since: t0 };
        let (next, transition) = poll(state, false, t0 + Duration::from_secs(5));
        assert_eq!(next, ThresholdState::Idle);
        assert_eq!(transition, Some(Transition::RunCleared));
        assert_eq!(next.threshold_timestamp(), None);
    }

    #[test]
    fn alerted_implies_run_in_progress() {
        let t0 = Instant::now();
        let mut state = ThresholdState::Idle;
        let pattern = [true, true, false, true, true, true, false, false, true];
        for (i, below) in pattern.into_iter().enumerate() {
            state = poll(state, below, t0 + Duration::from_secs(i as u64)).0;
            if state.alerted() {
                assert!(state.was_below_threshold());
                assert!(state.threshold_timestamp().is_some());
            }
            assert_eq!(state.was_below_threshold(), state.threshold_timestamp().is_some());
        }
    }
}
