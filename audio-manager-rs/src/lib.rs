//! Audio endpoint adapter - Library
//!
//! Lets a settings application enumerate, select and control the system
//! audio endpoints it cares about.
//!
//! ## Features
//!
//! - Track the default playback and recording devices
//! - Volume and mute control for the microphone and a user-chosen mirror output
//! - Set the OS default device (Console role by default)
//! - List active playback and recording devices
//! - Follow hot-plug and default-device changes and report them to a controller

pub mod audio;
pub mod platform;

pub use audio::{
    create_event_channel, AdapterConfig, AudioController, AudioError, AudioManager,
    ChannelController, ControllerEvent, DataFlow, DeviceInfo, DeviceRole, EndpointBackend,
};
pub use platform::PlatformBackend;
