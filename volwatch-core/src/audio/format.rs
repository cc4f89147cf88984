//! Integer sample width used when measuring volume.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VolwatchError;

/// Signed integer PCM width the volume is measured at.
///
/// Capture always delivers normalised f32; the format only decides the
/// integer scale of the reported RMS (e.g. `Int16` → 0..=32768).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Int8,
    #[default]
    Int16,
    Int32,
}

impl AudioFormat {
    /// Magnitude of full scale (`2^(bits-1)`).
    pub fn full_scale(self) -> f64 {
        match self {
            AudioFormat::Int8 => 128.0,
            AudioFormat::Int16 => 32_768.0,
            AudioFormat::Int32 => 2_147_483_648.0,
        }
    }

    /// Map a normalised sample onto this format's integer range.
    pub fn quantize(self, sample: f32) -> i64 {
        let scale = self.full_scale();
        let q = (sample as f64 * scale).round();
        q.clamp(-scale, scale - 1.0) as i64
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Int8 => write!(f, "int8"),
            AudioFormat::Int16 => write!(f, "int16"),
            AudioFormat::Int32 => write!(f, "int32"),
        }
    }
}

impl FromStr for AudioFormat {
    type Err = VolwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" | "i8" | "paint8" => Ok(AudioFormat::Int8),
            "int16" | "i16" | "paint16" => Ok(AudioFormat::Int16),
            "int32" | "i32" | "paint32" => Ok(AudioFormat::Int32),
            other => Err(VolwatchError::InvalidFormat(other.to_string())),
        }
    }
}
