//! Backend for targets without a native endpoint implementation.

use crate::audio::backend::{
    DefaultEndpointPolicy, EndpointBackend, EndpointDevice, EndpointEventSink, EndpointVolume,
};
use crate::audio::device::{AudioError, DataFlow, DeviceRole};
use std::sync::Arc;

/// Uninhabited handle type: no value of it can exist.
pub enum Never {}

impl EndpointDevice for Never {
    fn id(&self) -> Result<String, AudioError> {
        match *self {}
    }

    fn name(&self) -> Result<String, AudioError> {
        match *self {}
    }
}

impl EndpointVolume for Never {
    fn volume(&self) -> Result<f32, AudioError> {
        match *self {}
    }

    fn set_volume(&self, _level: f32) -> Result<(), AudioError> {
        match *self {}
    }

    fn muted(&self) -> Result<bool, AudioError> {
        match *self {}
    }

    fn set_muted(&self, _muted: bool) -> Result<(), AudioError> {
        match *self {}
    }
}

impl DefaultEndpointPolicy for Never {
    fn set_default_endpoint(&self, _device_id: &str, _role: DeviceRole) -> Result<(), AudioError> {
        match *self {}
    }
}

/// Never constructed; [`UnsupportedBackend::new`] always fails.
pub struct UnsupportedBackend {
    never: Never,
}

impl UnsupportedBackend {
    pub fn new() -> Result<Self, AudioError> {
        Err(AudioError::UnsupportedPlatform)
    }
}

impl EndpointBackend for UnsupportedBackend {
    type Device = Never;
    type Volume = Never;
    type Policy = Never;
    type Registration = Never;

    fn default_device(&self, _flow: DataFlow, _role: DeviceRole) -> Result<Never, AudioError> {
        match self.never {}
    }

    fn device(&self, _device_id: &str) -> Result<Never, AudioError> {
        match self.never {}
    }

    fn active_devices(&self, _flow: DataFlow) -> Result<Vec<Never>, AudioError> {
        match self.never {}
    }

    fn activate_volume(&self, _device: &Never) -> Result<Never, AudioError> {
        match self.never {}
    }

    fn policy_config(&self) -> Result<Never, AudioError> {
        match self.never {}
    }

    fn register(&self, _sink: Arc<dyn EndpointEventSink>) -> Result<Never, AudioError> {
        match self.never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_fails() {
        assert!(matches!(
            UnsupportedBackend::new(),
            Err(AudioError::UnsupportedPlatform)
        ));
    }
}
