//! The seam between the adapter and the OS endpoint subsystem.
//!
//! [`EndpointBackend`] is the device enumerator: it hands out device handles,
//! activates volume-control proxies, probes the default-endpoint policy and
//! registers the notification sink. Handles are reference-counted proxies;
//! dropping one releases it.

use super::device::{AudioError, DataFlow, DeviceRole, EndpointEvent};
use std::sync::Arc;

/// A handle to one endpoint.
pub trait EndpointDevice: Send + 'static {
    /// Opaque OS device ID.
    fn id(&self) -> Result<String, AudioError>;

    /// Friendly name from the device property store.
    fn name(&self) -> Result<String, AudioError>;
}

/// Scalar volume and mute control for one endpoint.
pub trait EndpointVolume: Send + 'static {
    /// Get the current volume level (0.0 to 1.0).
    fn volume(&self) -> Result<f32, AudioError>;

    /// Set the volume level (0.0 to 1.0).
    fn set_volume(&self, level: f32) -> Result<(), AudioError>;

    /// Get the current mute state.
    fn muted(&self) -> Result<bool, AudioError>;

    /// Set the mute state.
    fn set_muted(&self, muted: bool) -> Result<(), AudioError>;
}

/// Writes the OS default-endpoint policy.
pub trait DefaultEndpointPolicy: Send + Sync + 'static {
    fn set_default_endpoint(&self, device_id: &str, role: DeviceRole) -> Result<(), AudioError>;
}

/// Receiver of raw endpoint notifications. Called on an OS-chosen thread.
pub trait EndpointEventSink: Send + Sync {
    fn on_endpoint_event(&self, event: EndpointEvent);
}

/// OS device enumerator.
pub trait EndpointBackend: Send + Sync + 'static {
    type Device: EndpointDevice;
    type Volume: EndpointVolume;
    type Policy: DefaultEndpointPolicy;

    /// Guard for a notification registration. Dropping it unregisters.
    type Registration: Send + Sync + 'static;

    /// Default endpoint for a flow and role.
    fn default_device(&self, flow: DataFlow, role: DeviceRole)
        -> Result<Self::Device, AudioError>;

    /// Look up an endpoint by ID.
    fn device(&self, device_id: &str) -> Result<Self::Device, AudioError>;

    /// All active endpoints of a flow, in OS enumeration order.
    fn active_devices(&self, flow: DataFlow) -> Result<Vec<Self::Device>, AudioError>;

    /// Activate the volume-control proxy of a device.
    fn activate_volume(&self, device: &Self::Device) -> Result<Self::Volume, AudioError>;

    /// Probe the optional default-endpoint policy service.
    fn policy_config(&self) -> Result<Self::Policy, AudioError>;

    /// Register a sink for endpoint notifications.
    fn register(&self, sink: Arc<dyn EndpointEventSink>)
        -> Result<Self::Registration, AudioError>;
}
