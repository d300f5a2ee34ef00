//! Windows Core Audio backend.
//!
//! Device handles are `IMMDevice`, volume proxies are `IAudioEndpointVolume`,
//! default selection goes through the undocumented `IPolicyConfig` family,
//! and notifications arrive through an `IMMNotificationClient`.

mod com;
mod enumerator;
mod notifications;
mod policy;
mod volume;

pub use com::{ComApartment, ComGuard};
pub use enumerator::{WindowsBackend, WindowsDevice};
pub use notifications::NotificationRegistration;
pub use policy::PolicyConfig;
pub use volume::VolumeController;
