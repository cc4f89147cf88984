//! Audio input device enumeration and selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VolwatchError;

/// Metadata about an audio input device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Position in the host's input device list; usable as a selector.
    pub index: usize,
    /// Human-readable device name reported by the OS.
    pub name: String,
    /// Whether this is the system default input device.
    pub is_default: bool,
    /// Channel count of the device's default input config.
    pub max_input_channels: u16,
    /// Sample rate of the device's default input config (Hz).
    pub default_sample_rate: u32,
}

/// Which input device to open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceSelector {
    /// The host's default input device.
    #[default]
    Default,
    /// Position in the host's input device list.
    Index(usize),
    /// Exact device name.
    Name(String),
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Default => write!(f, "default"),
            DeviceSelector::Index(idx) => write!(f, "#{idx}"),
            DeviceSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = VolwatchError;

    /// A bare integer selects by index, `default` (or empty) the default
    /// device, anything else by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("default") {
            return Ok(DeviceSelector::Default);
        }
        match trimmed.parse::<usize>() {
            Ok(idx) => Ok(DeviceSelector::Index(idx)),
            Err(_) => Ok(DeviceSelector::Name(trimmed.to_string())),
        }
    }
}

/// Resolve `selector` against the host's input devices.
///
/// # Errors
/// `NoDefaultInputDevice` when the default is requested but absent,
/// `DeviceNotFound` when an index or name matches nothing.
#[cfg(feature = "audio-cpal")]
pub fn resolve_input_device(
    host: &cpal::Host,
    selector: &DeviceSelector,
) -> crate::error::Result<cpal::Device> {
    use cpal::traits::{DeviceTrait, HostTrait};

    match selector {
        DeviceSelector::Default => host
            .default_input_device()
            .ok_or(VolwatchError::NoDefaultInputDevice),
        DeviceSelector::Index(idx) => host
            .input_devices()
            .map_err(|e| VolwatchError::AudioDevice(e.to_string()))?
            .nth(*idx)
            .ok_or_else(|| VolwatchError::DeviceNotFound(selector.to_string())),
        DeviceSelector::Name(name) => host
            .input_devices()
            .map_err(|e| VolwatchError::AudioDevice(e.to_string()))?
            .find(|device| device.name().map(|n| &n == name).unwrap_or(false))
            .ok_or_else(|| VolwatchError::DeviceNotFound(selector.to_string())),
    }
}

/// List all available audio input devices on the system.
///
/// Devices whose default config cannot be queried are reported with zero
/// channels and sample rate rather than skipped, so indices stay aligned
/// with [`DeviceSelector::Index`].
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> crate::error::Result<Vec<DeviceInfo>> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| VolwatchError::AudioDevice(e.to_string()))?;

    Ok(devices
        .enumerate()
        .map(|(index, device)| {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("Input Device {}", index + 1));
            let is_default = default_name.as_deref() == Some(name.as_str());
            let (max_input_channels, default_sample_rate) = match device.default_input_config() {
                Ok(cfg) => (cfg.channels(), cfg.sample_rate().0),
                Err(e) => {
                    tracing::warn!(device = %name, "failed to query input config: {e}");
                    (0, 0)
                }
            };
            DeviceInfo {
                index,
                name,
                is_default,
                max_input_channels,
                default_sample_rate,
            }
        })
        .collect())
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> crate::error::Result<Vec<DeviceInfo>> {
    Ok(vec![])
}
