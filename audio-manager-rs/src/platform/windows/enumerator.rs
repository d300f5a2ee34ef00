//! Device enumeration using the Windows MMDevice API.

use super::com::{take_co_string, to_wide};
use super::notifications::NotificationRegistration;
use super::policy::PolicyConfig;
use super::volume::VolumeController;
use crate::audio::backend::{EndpointBackend, EndpointDevice, EndpointEventSink};
use crate::audio::device::{AudioError, DataFlow, DeviceRole};
use std::sync::Arc;
use windows::core::PCWSTR;
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eCapture, eCommunications, eConsole, eMultimedia, eRender, EDataFlow, ERole, IMMDevice,
    IMMDeviceEnumerator, MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL, STGM_READ};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

pub(super) fn to_edataflow(flow: DataFlow) -> EDataFlow {
    match flow {
        DataFlow::Render => eRender,
        DataFlow::Capture => eCapture,
    }
}

pub(super) fn to_erole(role: DeviceRole) -> ERole {
    match role {
        DeviceRole::Console => eConsole,
        DeviceRole::Multimedia => eMultimedia,
        DeviceRole::Communications => eCommunications,
    }
}

/// A handle to one endpoint.
pub struct WindowsDevice {
    device: IMMDevice,
}

// SAFETY: MMDevice objects are free-threaded; the adapter serializes access
// to each cached handle behind a mutex.
unsafe impl Send for WindowsDevice {}

impl EndpointDevice for WindowsDevice {
    fn id(&self) -> Result<String, AudioError> {
        unsafe {
            let id = self.device.GetId()?;
            take_co_string(id)
        }
    }

    fn name(&self) -> Result<String, AudioError> {
        unsafe {
            let props: IPropertyStore = self.device.OpenPropertyStore(STGM_READ)?;

            // Convert DEVPROPKEY to PROPERTYKEY
            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };
            let prop = props.GetValue(&key)?;

            Ok(prop.to_string())
        }
    }
}

/// Device enumerator using the Windows MMDevice API.
pub struct WindowsBackend {
    enumerator: IMMDeviceEnumerator,
}

// SAFETY: the MMDevice enumerator is free-threaded and is read-only after
// construction.
unsafe impl Send for WindowsBackend {}
unsafe impl Sync for WindowsBackend {}

impl WindowsBackend {
    /// Create the device enumerator.
    ///
    /// Note: COM must be initialized before calling this function.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| AudioError::EnumeratorUnavailable(e.message()))?;

            Ok(Self { enumerator })
        }
    }
}

impl EndpointBackend for WindowsBackend {
    type Device = WindowsDevice;
    type Volume = VolumeController;
    type Policy = PolicyConfig;
    type Registration = NotificationRegistration;

    fn default_device(
        &self,
        flow: DataFlow,
        role: DeviceRole,
    ) -> Result<WindowsDevice, AudioError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(to_edataflow(flow), to_erole(role))
                .map_err(|_| AudioError::NoDefaultDevice)?;
            Ok(WindowsDevice { device })
        }
    }

    fn device(&self, device_id: &str) -> Result<WindowsDevice, AudioError> {
        unsafe {
            let device_id_wide = to_wide(device_id);

            let device = self
                .enumerator
                .GetDevice(PCWSTR::from_raw(device_id_wide.as_ptr()))
                .map_err(|_| AudioError::DeviceNotFound {
                    device_id: device_id.to_string(),
                })?;

            Ok(WindowsDevice { device })
        }
    }

    fn active_devices(&self, flow: DataFlow) -> Result<Vec<WindowsDevice>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(to_edataflow(flow), DEVICE_STATE_ACTIVE)?;

            let count = collection.GetCount()?;

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                if let Ok(device) = collection.Item(i) {
                    devices.push(WindowsDevice { device });
                }
            }

            Ok(devices)
        }
    }

    fn activate_volume(&self, device: &WindowsDevice) -> Result<VolumeController, AudioError> {
        VolumeController::new(&device.device)
    }

    fn policy_config(&self) -> Result<PolicyConfig, AudioError> {
        PolicyConfig::probe()
    }

    fn register(
        &self,
        sink: Arc<dyn EndpointEventSink>,
    ) -> Result<NotificationRegistration, AudioError> {
        NotificationRegistration::register(&self.enumerator, sink)
    }
}
