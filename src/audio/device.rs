//! Input device enumeration and validation.

use serde::{Deserialize, Serialize};

use crate::error::{LoopcapError, Result};

/// Metadata about an audio input device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name reported by the OS.
    pub name: String,
    /// Whether this is the system default input device.
    pub is_default: bool,
}

/// List all available audio input devices, default first.
///
/// Returns an empty `Vec` when enumeration fails or no devices exist.
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    match host.input_devices() {
        Ok(devices) => {
            let mut list = devices
                .enumerate()
                .map(|(idx, device)| {
                    let name = device
                        .name()
                        .unwrap_or_else(|_| format!("Input Device {}", idx + 1));
                    let is_default = default_name.as_deref() == Some(name.as_str());
                    DeviceInfo { name, is_default }
                })
                .collect::<Vec<_>>();
            list.sort_by_key(|d| (!d.is_default, d.name.to_ascii_lowercase()));
            list
        }
        Err(e) => {
            tracing::warn!("failed to enumerate input devices: {e}");
            Vec::new()
        }
    }
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    Vec::new()
}

/// Check that an input device with this exact name exists, before any
/// stream is opened. Lets callers reject a bad configuration up front
/// instead of discovering it from a failed capture.
pub fn ensure_input_device(name: &str) -> Result<()> {
    if list_input_devices().iter().any(|d| d.name == name) {
        Ok(())
    } else {
        Err(LoopcapError::DeviceNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ensure_input_device;

    #[test]
    fn unknown_device_is_rejected() {
        // No CI machine ships a device with this name.
        assert!(ensure_input_device("loopcap-test-nonexistent-device-7f3a").is_err());
    }
}
