//! Callbacks into the owning settings controller.
//!
//! The adapter never passes values through these callbacks; the controller
//! re-reads whatever state it needs from the adapter.

use std::sync::mpsc::{Receiver, Sender};

/// Callback contract the adapter invokes on its owning controller.
///
/// Methods may be invoked from an OS notification thread.
pub trait AudioController: Send + Sync {
    /// The playback device changed (explicitly or by the OS).
    fn on_new_playback_device(&self);

    /// The recording device changed (explicitly or by the OS).
    fn on_new_recording_device(&self);

    /// The mirror device changed (explicit selection only).
    fn on_new_mirror_device(&self);

    /// An endpoint was connected.
    fn on_device_added(&self);

    /// An endpoint was disconnected.
    fn on_device_removed(&self);
}

/// Controller notifications as values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    NewPlaybackDevice,
    NewRecordingDevice,
    NewMirrorDevice,
    DeviceAdded,
    DeviceRemoved,
}

/// Controller that sends events to a channel.
pub struct ChannelController {
    sender: Sender<ControllerEvent>,
}

impl ChannelController {
    pub fn new(sender: Sender<ControllerEvent>) -> Self {
        Self { sender }
    }

    fn send(&self, event: ControllerEvent) {
        // The receiving side going away is not an adapter error
        let _ = self.sender.send(event);
    }
}

impl AudioController for ChannelController {
    fn on_new_playback_device(&self) {
        self.send(ControllerEvent::NewPlaybackDevice);
    }

    fn on_new_recording_device(&self) {
        self.send(ControllerEvent::NewRecordingDevice);
    }

    fn on_new_mirror_device(&self) {
        self.send(ControllerEvent::NewMirrorDevice);
    }

    fn on_device_added(&self) {
        self.send(ControllerEvent::DeviceAdded);
    }

    fn on_device_removed(&self) {
        self.send(ControllerEvent::DeviceRemoved);
    }
}

/// Creates an event channel for a [`ChannelController`].
pub fn create_event_channel() -> (Sender<ControllerEvent>, Receiver<ControllerEvent>) {
    std::sync::mpsc::channel()
}
