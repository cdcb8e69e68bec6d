use super::error::DeviceError;
use cpal::traits::{DeviceTrait, HostTrait};
use std::collections::HashSet;
use std::fmt;

/// Position of a device in the host's input device enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub id: DeviceId,
    pub name: String,
    pub max_input_channels: u16,
}

/// Source of selectable input devices
pub trait DeviceCatalog: Send + Sync {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, DeviceError>;

    /// Resolve a human-chosen device name to a device
    fn resolve(&self, name: &str) -> Result<InputDevice, DeviceError> {
        let device = self
            .list_input_devices()?
            .into_iter()
            .find(|device| device.name == name)
            .ok_or_else(|| DeviceError::NotFound(name.to_string()))?;

        if device.max_input_channels == 0 {
            return Err(DeviceError::UnsupportedChannels(device.name));
        }
        Ok(device)
    }
}

/// Devices of the default cpal host
pub struct CpalDevices;

impl DeviceCatalog for CpalDevices {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, DeviceError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?;

        let listed = devices
            .enumerate()
            .map(|(index, device)| InputDevice {
                id: DeviceId(index),
                name: device
                    .name()
                    .unwrap_or_else(|_| "Unknown Device".to_string()),
                max_input_channels: max_input_channels(&device),
            })
            .collect();

        Ok(usable_devices(listed))
    }
}

pub(crate) fn max_input_channels(device: &cpal::Device) -> u16 {
    match device.supported_input_configs() {
        Ok(configs) => configs.map(|config| config.channels()).max().unwrap_or(0),
        Err(e) => {
            tracing::debug!("No input configs for device: {}", e);
            0
        }
    }
}

/// Keep devices that can record, dropping later duplicates of the same name
fn usable_devices(devices: Vec<InputDevice>) -> Vec<InputDevice> {
    let mut seen = HashSet::new();
    devices
        .into_iter()
        .filter(|device| device.max_input_channels > 0)
        .filter(|device| seen.insert(device.name.clone()))
        .collect()
}
