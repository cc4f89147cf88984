use thiserror::Error;

/// All errors produced by volwatch-core.
#[derive(Debug, Error)]
pub enum VolwatchError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no input device found, can't proceed")]
    NoDefaultInputDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("detectors must be: simple or timed (got '{0}')")]
    InvalidDetector(String),

    #[error("operator must be: lt or gt (got '{0}')")]
    InvalidOperator(String),

    #[error("audio format must be: int8, int16 or int32 (got '{0}')")]
    InvalidFormat(String),

    #[error("invalid detector config: {0}")]
    InvalidConfig(String),

    #[error("calibration collected no volume readings")]
    EmptyCalibration,

    #[error("no audio received for {waited_ms} ms")]
    CaptureStalled { waited_ms: u64 },

    #[error("sample source exhausted")]
    Exhausted,

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VolwatchError>;
