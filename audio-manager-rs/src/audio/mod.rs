//! Audio endpoint adapter.
//!
//! This module provides the platform-neutral adapter core, the backend seam
//! it drives, and the controller callback contract.

pub mod backend;
pub mod config;
pub mod controller;
pub mod device;
pub mod manager;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod policy;

pub use backend::{
    DefaultEndpointPolicy, EndpointBackend, EndpointDevice, EndpointEventSink, EndpointVolume,
};
pub use config::AdapterConfig;
pub use controller::{create_event_channel, AudioController, ChannelController, ControllerEvent};
pub use device::{AudioError, DataFlow, DeviceInfo, DeviceRole, DeviceState, EndpointEvent};
pub use manager::AudioManager;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
