//! Native endpoint backends.
//!
//! Windows uses the MMDevice / EndpointVolume APIs. Other targets get a
//! backend whose construction fails, so the adapter and the C ABI still build.

#[cfg(not(windows))]
pub mod unsupported;
#[cfg(windows)]
pub mod windows;

/// Endpoint backend for the current target.
#[cfg(windows)]
pub type PlatformBackend = self::windows::WindowsBackend;

/// Endpoint backend for the current target.
#[cfg(not(windows))]
pub type PlatformBackend = self::unsupported::UnsupportedBackend;

#[cfg(windows)]
pub use self::windows::{ComApartment, ComGuard};
