//! Volume control using IAudioEndpointVolume.

use crate::audio::backend::EndpointVolume;
use crate::audio::device::AudioError;
use windows::Win32::Media::Audio::{Endpoints::IAudioEndpointVolume, IMMDevice};
use windows::Win32::System::Com::CLSCTX_INPROC_SERVER;

/// Volume-control proxy for a specific device.
pub struct VolumeController {
    endpoint_volume: IAudioEndpointVolume,
}

// SAFETY: endpoint volume objects are free-threaded; the adapter serializes
// calls per role behind a mutex.
unsafe impl Send for VolumeController {}

impl VolumeController {
    /// Activate the volume-control proxy of a device.
    pub fn new(device: &IMMDevice) -> Result<Self, AudioError> {
        unsafe {
            let endpoint_volume: IAudioEndpointVolume = device
                .Activate(CLSCTX_INPROC_SERVER, None)
                .map_err(|_| AudioError::VolumeNotAvailable)?;

            Ok(Self { endpoint_volume })
        }
    }
}

impl EndpointVolume for VolumeController {
    fn muted(&self) -> Result<bool, AudioError> {
        unsafe {
            let muted = self.endpoint_volume.GetMute()?;
            Ok(muted.as_bool())
        }
    }

    fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume.SetMute(muted, std::ptr::null())?;
            Ok(())
        }
    }

    fn volume(&self) -> Result<f32, AudioError> {
        unsafe {
            let level = self.endpoint_volume.GetMasterVolumeLevelScalar()?;
            Ok(level)
        }
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume
                .SetMasterVolumeLevelScalar(level, std::ptr::null())?;
            Ok(())
        }
    }
}
