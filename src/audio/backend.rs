//! cpal implementation of [`AudioBackend`] on the default host.

use cpal::traits::HostTrait;
use tracing::debug;

use super::capture::CpalInput;
use super::device::{AudioBackend, DeviceInfo, Direction, InputStream, OutputStream};
use super::format::SessionConfig;
use super::playback::CpalOutput;
use super::util::get_device_name;
use crate::error::{RecorderError, Result};

/// Opens streams on the default input and output devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open_input(&self, config: &SessionConfig) -> Result<Box<dyn InputStream>> {
        Ok(Box::new(CpalInput::open(config)?))
    }

    fn open_output(&self, config: &SessionConfig) -> Result<Box<dyn OutputStream>> {
        Ok(Box::new(CpalOutput::open(config)?))
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let host = cpal::default_host();
        debug!("Enumerating devices on host {:?}", host.id());

        let default_input = host.default_input_device().map(|d| get_device_name(&d));
        let default_output = host.default_output_device().map(|d| get_device_name(&d));

        let inputs = host
            .input_devices()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to enumerate input devices: {e}")))?;
        let outputs = host
            .output_devices()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to enumerate output devices: {e}")))?;

        let describe = |name: String, direction: Direction, default: &Option<String>| DeviceInfo {
            is_default: default.as_deref() == Some(name.as_str()),
            name,
            direction,
        };

        let mut devices: Vec<DeviceInfo> = inputs
            .map(|d| describe(get_device_name(&d), Direction::Input, &default_input))
            .collect();
        devices.extend(outputs.map(|d| describe(get_device_name(&d), Direction::Output, &default_output)));

        Ok(devices)
    }
}
