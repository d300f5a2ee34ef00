//! Audio endpoint data models.
//!
//! Defines the plain values the adapter hands out (device listings, roles,
//! flows), the raw events reported by the OS, and the error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An active endpoint as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Opaque OS device ID (from IMMDevice::GetId on Windows)
    pub id: String,

    /// Friendly name; empty if the OS exposes none
    pub name: String,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Direction of an endpoint (maps to Windows EDataFlow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFlow {
    /// Playback devices (speakers, headsets, HMD audio out)
    Render,

    /// Recording devices (microphones)
    Capture,
}

/// Audio device role (maps to Windows ERole enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum DeviceRole {
    /// Used by games, system sounds, most general applications
    Console = 0,

    /// Used by music players, video players
    Multimedia = 1,

    /// Used by Teams, Zoom, Discord, and other VoIP applications
    Communications = 2,
}

/// Endpoint state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Device is active and available for use
    Active,

    /// Device is disabled in Windows Sound settings
    Disabled,

    /// Device is not present (driver issue)
    NotPresent,

    /// Device is unplugged (for pluggable devices)
    Unplugged,
}

impl DeviceState {
    /// Convert a DEVICE_STATE_XXX bit value.
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => DeviceState::Active,
            2 => DeviceState::Disabled,
            8 => DeviceState::Unplugged,
            _ => DeviceState::NotPresent,
        }
    }
}

/// Raw notifications from the OS endpoint subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// A new audio device was connected
    DeviceAdded { device_id: String },

    /// An audio device was disconnected
    DeviceRemoved { device_id: String },

    /// Device state changed (active, disabled, not present, unplugged)
    DeviceStateChanged {
        device_id: String,
        new_state: DeviceState,
    },

    /// Default device changed for a flow and role
    DefaultDeviceChanged {
        flow: DataFlow,
        role: DeviceRole,
        device_id: Option<String>, // None if no default device remains
    },

    /// A device property changed (name, format, ...)
    PropertyValueChanged { device_id: String },
}

/// Audio adapter error types.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("Could not create audio device enumerator: {0}")]
    EnumeratorUnavailable(String),

    #[error("Audio endpoint control is not supported on this platform")]
    UnsupportedPlatform,

    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("No default device available")]
    NoDefaultDevice,

    #[error("Volume control not available for device")]
    VolumeNotAvailable,

    #[error("Could not find PolicyConfig interface")]
    PolicyConfigUnavailable,

    #[error("Failed to register endpoint notifications: {0}")]
    NotificationRegistration(String),

    #[error("COM initialization failed (0x{code:08X}): {message}")]
    ComInitFailed { code: i32, message: String },

    #[error("OS audio error (0x{code:08X}): {message}")]
    Os { code: i32, message: String },

    #[error("String conversion error: {0}")]
    StringConversion(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for AudioError {
    fn from(err: windows::core::Error) -> Self {
        AudioError::Os {
            code: err.code().0,
            message: err.message(),
        }
    }
}
