//! Device change notifications using IMMNotificationClient.
//!
//! The COM object only translates callbacks into [`EndpointEvent`]s for the
//! adapter's sink. Its registration is held by a guard that unregisters on
//! drop; the adapter owns that guard.

use super::com::borrowed_string;
use crate::audio::backend::EndpointEventSink;
use crate::audio::device::{AudioError, DataFlow, DeviceRole, DeviceState, EndpointEvent};
use std::sync::Arc;
use tracing::warn;
use windows::core::{implement, PCWSTR};
use windows::Win32::Media::Audio::{
    eCapture, eCommunications, eConsole, eMultimedia, eRender, EDataFlow, ERole,
    IMMDeviceEnumerator, IMMNotificationClient, IMMNotificationClient_Impl, DEVICE_STATE,
};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

/// Notification client that forwards events to the adapter.
#[implement(IMMNotificationClient)]
struct DeviceNotificationClient {
    sink: Arc<dyn EndpointEventSink>,
}

impl DeviceNotificationClient {
    fn convert_flow(flow: EDataFlow) -> Option<DataFlow> {
        if flow == eRender {
            Some(DataFlow::Render)
        } else if flow == eCapture {
            Some(DataFlow::Capture)
        } else {
            None
        }
    }

    fn convert_role(role: ERole) -> Option<DeviceRole> {
        if role == eConsole {
            Some(DeviceRole::Console)
        } else if role == eMultimedia {
            Some(DeviceRole::Multimedia)
        } else if role == eCommunications {
            Some(DeviceRole::Communications)
        } else {
            None
        }
    }
}

impl IMMNotificationClient_Impl for DeviceNotificationClient_Impl {
    fn OnDeviceStateChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        if let Some(device_id) = unsafe { borrowed_string(pwstrdeviceid) } {
            self.sink.on_endpoint_event(EndpointEvent::DeviceStateChanged {
                device_id,
                new_state: DeviceState::from_bits(dwnewstate.0),
            });
        }
        Ok(())
    }

    fn OnDeviceAdded(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        let device_id = unsafe { borrowed_string(pwstrdeviceid) }.unwrap_or_default();
        self.sink
            .on_endpoint_event(EndpointEvent::DeviceAdded { device_id });
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        let device_id = unsafe { borrowed_string(pwstrdeviceid) }.unwrap_or_default();
        self.sink
            .on_endpoint_event(EndpointEvent::DeviceRemoved { device_id });
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        let (Some(flow), Some(role)) = (
            DeviceNotificationClient::convert_flow(flow),
            DeviceNotificationClient::convert_role(role),
        ) else {
            return Ok(());
        };
        self.sink.on_endpoint_event(EndpointEvent::DefaultDeviceChanged {
            flow,
            role,
            device_id: unsafe { borrowed_string(pwstrdefaultdeviceid) },
        });
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        if let Some(device_id) = unsafe { borrowed_string(pwstrdeviceid) } {
            self.sink
                .on_endpoint_event(EndpointEvent::PropertyValueChanged { device_id });
        }
        Ok(())
    }
}

/// A live registration of the adapter's notification client.
///
/// Dropping the guard unregisters the client from the enumerator.
pub struct NotificationRegistration {
    enumerator: IMMDeviceEnumerator,
    client: IMMNotificationClient,
}

// SAFETY: both interfaces are free-threaded; the guard is only used to
// unregister.
unsafe impl Send for NotificationRegistration {}
unsafe impl Sync for NotificationRegistration {}

impl NotificationRegistration {
    pub(super) fn register(
        enumerator: &IMMDeviceEnumerator,
        sink: Arc<dyn EndpointEventSink>,
    ) -> Result<Self, AudioError> {
        let client: IMMNotificationClient = DeviceNotificationClient { sink }.into();
        unsafe {
            enumerator
                .RegisterEndpointNotificationCallback(&client)
                .map_err(|e| AudioError::NotificationRegistration(e.message()))?;
        }
        Ok(Self {
            enumerator: enumerator.clone(),
            client,
        })
    }
}

impl Drop for NotificationRegistration {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self
                .enumerator
                .UnregisterEndpointNotificationCallback(&self.client)
            {
                warn!(error = %e, "UnregisterEndpointNotificationCallback failed");
            }
        }
    }
}
