use std::io::Cursor;
use std::time::Duration;

use volwatch_core::detector::machine::Transition;
use volwatch_core::events::NullSink;
use volwatch_core::sampler::SampleShape;
use volwatch_core::{
    AudioFormat, Clock, Comparator, DetectorConfig, DetectorEvent, DetectorMode, ManualClock,
    ScriptedSampler, ThresholdDetector, ThresholdState, VolumeSampler, VolwatchError, WavSampler,
};

const BELOW: u64 = 50;
const ABOVE: u64 = 5_000;

/// Sampler that fails on the Nth reading, standing in for a device that
/// disappears mid-run.
struct FailingSampler {
    inner: ScriptedSampler,
    fail_after: usize,
    taken: usize,
}

impl VolumeSampler for FailingSampler {
    fn sample_volume(&mut self) -> volwatch_core::error::Result<u64> {
        if self.taken == self.fail_after {
            return Err(VolwatchError::AudioStream("device unplugged".into()));
        }
        self.taken += 1;
        self.inner.sample_volume()
    }
}

fn timed_config(time_threshold: Duration) -> DetectorConfig {
    DetectorConfig {
        volume_threshold: Some(1_000.0),
        time_threshold,
        operator: Comparator::Lt,
        mode: DetectorMode::Timed,
        startup_delay: Duration::ZERO,
        ..DetectorConfig::default()
    }
}

fn one_second_polls(readings: &[u64]) -> (ScriptedSampler, ManualClock) {
    let clock = ManualClock::new();
    let sampler = ScriptedSampler::new(readings.iter().copied())
        .with_clock(clock.clone(), Duration::from_secs(1));
    (sampler, clock)
}

#[test]
fn alert_fires_once_then_clears_on_recovery() {
    let (sampler, clock) = one_second_polls(&[BELOW, BELOW, BELOW, ABOVE]);
    let mut events: Vec<DetectorEvent> = Vec::new();
    let mut detector = ThresholdDetector::new(
        timed_config(Duration::from_millis(500)),
        sampler,
        clock.clone(),
        &mut events,
    )
    .expect("detector");

    let first = detector.poll(&mut events).unwrap();
    assert_eq!(first.transition, Some(Transition::RunStarted));
    assert!(!detector.state().alerted());
    assert!(detector.state().was_below_threshold());
    let run_start = detector.state().threshold_timestamp().expect("run started");

    let second = detector.poll(&mut events).unwrap();
    assert_eq!(second.transition, Some(Transition::ThresholdsMet));
    assert!(detector.state().alerted());

    let third = detector.poll(&mut events).unwrap();
    assert_eq!(third.transition, None);
    assert!(detector.state().alerted());

    let fourth = detector.poll(&mut events).unwrap();
    assert!(!fourth.below);
    assert_eq!(detector.state(), ThresholdState::Idle);
    assert!(!detector.state().alerted());
    assert!(!detector.state().was_below_threshold());
    assert_eq!(detector.state().threshold_timestamp(), None);

    let alerts = events
        .iter()
        .filter(|e| **e == DetectorEvent::ThresholdsMet)
        .count();
    assert_eq!(alerts, 1);

    let elapsed = clock.now() - run_start;
    assert_eq!(elapsed, Duration::from_secs(3));
    assert_eq!(
        events.last(),
        Some(&DetectorEvent::Recovered { elapsed_secs: 3.0 })
    );
}

#[test]
fn short_dip_never_alerts() {
    let (sampler, clock) = one_second_polls(&[BELOW, BELOW, ABOVE, BELOW, ABOVE]);
    let mut events: Vec<DetectorEvent> = Vec::new();
    let mut detector = ThresholdDetector::new(
        timed_config(Duration::from_secs(5)),
        sampler,
        clock,
        &mut events,
    )
    .unwrap();

    let summary = detector.run(&mut events, None).unwrap();
    assert_eq!(summary.polls, 5);
    assert_eq!(summary.alerts, 0);

    let status: Vec<&DetectorEvent> = events
        .iter()
        .filter(|e| !matches!(e, DetectorEvent::Volume { .. }))
        .collect();
    assert_eq!(
        status,
        vec![
            &DetectorEvent::RunStarted,
            &DetectorEvent::RunCleared,
            &DetectorEvent::RunStarted,
            &DetectorEvent::RunCleared,
        ]
    );
}

#[test]
fn gt_operator_alerts_on_sustained_noise() {
    let (sampler, clock) = one_second_polls(&[ABOVE, ABOVE, ABOVE, BELOW]);
    let mut config = timed_config(Duration::from_millis(1500));
    config.operator = Comparator::Gt;
    let mut events: Vec<DetectorEvent> = Vec::new();
    let mut detector = ThresholdDetector::new(config, sampler, clock, &mut events).unwrap();

    let summary = detector.run(&mut events, None).unwrap();
    assert_eq!(summary.alerts, 1);
    assert!(events.contains(&DetectorEvent::Recovered { elapsed_secs: 3.0 }));
}

#[test]
fn sampler_error_propagates_out_of_run() {
    let (inner, clock) = one_second_polls(&[BELOW, BELOW, BELOW]);
    let sampler = FailingSampler {
        inner,
        fail_after: 2,
        taken: 0,
    };
    let mut events: Vec<DetectorEvent> = Vec::new();
    let mut detector = ThresholdDetector::new(
        timed_config(Duration::from_millis(500)),
        sampler,
        clock,
        &mut events,
    )
    .unwrap();

    let err = detector.run(&mut events, None).unwrap_err();
    assert!(matches!(err, VolwatchError::AudioStream(_)));
}

#[test]
fn calibration_then_detection_from_wav() {
    // 1 kHz mono: 1 s of low hiss, 3 s of silence, then 1 s of loud audio.
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 1_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..1_000 {
            writer.write_sample(if i % 2 == 0 { 100i16 } else { -100 }).unwrap();
        }
        for _ in 0..3_000 {
            writer.write_sample(0i16).unwrap();
        }
        for i in 0..1_000 {
            writer.write_sample(if i % 2 == 0 { 8_000i16 } else { -8_000 }).unwrap();
        }
        writer.finalize().unwrap();
    }

    let shape = SampleShape {
        chunk: 100,
        recording_sample: Duration::from_millis(250),
        format: AudioFormat::Int16,
    };
    let clock = ManualClock::new();
    let sampler = WavSampler::from_reader(Cursor::new(cursor.into_inner()), shape)
        .unwrap()
        .with_clock(clock.clone());

    let mut config = timed_config(Duration::from_secs(2));
    config.volume_threshold = None;
    config.chunk = shape.chunk;
    config.recording_sample = shape.recording_sample;
    config.calibration.duration = Duration::from_secs(1);
    config.calibration.multiplier = 2.0;

    let mut events: Vec<DetectorEvent> = Vec::new();
    let mut detector = ThresholdDetector::new(config, sampler, clock, &mut events).unwrap();
    // Hiss RMS is 100 on every reading → threshold 200.
    assert_eq!(detector.volume_threshold(), 200.0);

    let summary = detector.run(&mut events, None).unwrap();
    // Readings cover 0.2 s each: 15 silent, then 5 loud.
    assert_eq!(summary.polls, 20);
    assert_eq!(summary.alerts, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, DetectorEvent::Recovered { .. })));
}

#[test]
fn recalibration_replaces_the_threshold() {
    let (sampler, clock) = one_second_polls(&[300, 500, 40, 60]);
    let mut config = timed_config(Duration::from_secs(1));
    config.calibration.duration = Duration::from_secs(2);
    config.calibration.multiplier = 1.5;
    let mut detector = ThresholdDetector::new(config, sampler, clock, &mut NullSink).unwrap();
    assert_eq!(detector.volume_threshold(), 1_000.0);

    let calibration = detector.set_volume_threshold(&mut NullSink).unwrap();
    assert_eq!(calibration.readings, vec![300, 500]);
    assert_eq!(detector.volume_threshold(), 600.0);
    assert_eq!(detector.sampler().remaining(), 2);
}
