//! Audio input device enumeration and selection.

use cpal::traits::{DeviceTrait, HostTrait};

use sotto_core::{DeviceSelector, Result, SottoError};

/// One enumerable audio input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub name: String,
    pub max_channels: u16,
    pub is_default: bool,
}

/// Enumerate the host's audio input devices.
pub fn list_input_devices() -> Result<Vec<InputDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host
        .input_devices()
        .map_err(|e| SottoError::Audio(format!("Failed to enumerate input devices: {}", e)))?
    {
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let max_channels = device
            .default_input_config()
            .map(|c| c.channels())
            .unwrap_or(0);
        let is_default = default_name.as_deref() == Some(name.as_str());
        devices.push(InputDevice {
            name,
            max_channels,
            is_default,
        });
    }
    Ok(devices)
}

/// Resolve a device selector to a concrete cpal device.
///
/// `None` means the system default. Name selection is a case-insensitive
/// substring match so config files can carry partial names.
pub(crate) fn resolve_input_device(selector: Option<&DeviceSelector>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match selector {
        None => host
            .default_input_device()
            .ok_or_else(|| SottoError::Audio("No default input device found".to_string())),
        Some(DeviceSelector::Index(index)) => host
            .input_devices()
            .map_err(|e| SottoError::Audio(format!("Failed to enumerate input devices: {}", e)))?
            .nth(*index)
            .ok_or_else(|| {
                SottoError::Audio(format!("No input device at index {}", index))
            }),
        Some(DeviceSelector::Name(name)) => {
            let name_lower = name.to_lowercase();
            host.input_devices()
                .map_err(|e| {
                    SottoError::Audio(format!("Failed to enumerate input devices: {}", e))
                })?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&name_lower))
                        .unwrap_or(false)
                })
                .ok_or_else(|| SottoError::Audio(format!("Input device '{}' not found", name)))
        }
    }
}
