//! The endpoint adapter.
//!
//! [`AudioManager`] caches one device handle per role (playback, microphone,
//! mirror), forwards volume and mute calls to the cached volume-control
//! proxies, and keeps the playback/microphone cache in step with the OS
//! default-device notifications.

use super::backend::{
    DefaultEndpointPolicy, EndpointBackend, EndpointDevice, EndpointEventSink, EndpointVolume,
};
use super::config::AdapterConfig;
use super::controller::AudioController;
use super::device::{AudioError, DataFlow, DeviceInfo, EndpointEvent};
use super::lock;
use crate::platform::PlatformBackend;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, trace, warn};

/// A device handle and the volume-control proxy derived from it.
struct VolumeSlot<D, V> {
    // Declared first so the proxy is released before its device
    volume: Option<V>,
    device: Option<D>,
}

impl<D: EndpointDevice, V: EndpointVolume> VolumeSlot<D, V> {
    fn empty() -> Self {
        Self {
            volume: None,
            device: None,
        }
    }

    fn replace(&mut self, device: Option<D>, volume: Option<V>) {
        self.clear();
        self.device = device;
        self.volume = volume;
    }

    fn clear(&mut self) {
        self.volume = None;
        self.device = None;
    }

    fn is_valid(&self) -> bool {
        self.volume.is_some()
    }

    fn volume_level(&self) -> f32 {
        self.volume
            .as_ref()
            .and_then(|v| v.volume().ok())
            .unwrap_or(0.0)
    }

    fn set_volume_level(&self, level: f32) -> bool {
        if !level.is_finite() {
            return false;
        }
        self.volume
            .as_ref()
            .is_some_and(|v| v.set_volume(level).is_ok())
    }

    fn muted(&self) -> bool {
        self.volume
            .as_ref()
            .and_then(|v| v.muted().ok())
            .unwrap_or(false)
    }

    fn set_muted(&self, muted: bool) -> bool {
        self.volume
            .as_ref()
            .is_some_and(|v| v.set_muted(muted).is_ok())
    }
}

fn device_name<D: EndpointDevice>(device: Option<&D>) -> String {
    device.and_then(|d| d.name().ok()).unwrap_or_default()
}

fn device_id<D: EndpointDevice>(device: Option<&D>) -> String {
    device.and_then(|d| d.id().ok()).unwrap_or_default()
}

fn same_device<D: EndpointDevice>(a: Option<&D>, b: Option<&D>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => matches!((a.id(), b.id()), (Ok(x), Ok(y)) if x == y),
        _ => false,
    }
}

fn activate_volume<B: EndpointBackend>(backend: &B, device: &B::Device) -> Option<B::Volume> {
    match backend.activate_volume(device) {
        Ok(volume) => Some(volume),
        Err(e) => {
            warn!(
                device_id = %device_id(Some(device)),
                error = %e,
                "Could not activate volume control"
            );
            None
        }
    }
}

/// State shared between the adapter and its notification registration.
struct Shared<B: EndpointBackend> {
    mirror: Mutex<VolumeSlot<B::Device, B::Volume>>,
    mic: Mutex<VolumeSlot<B::Device, B::Volume>>,
    playback: Mutex<Option<B::Device>>,
    policy: Option<B::Policy>,
    controller: Arc<dyn AudioController>,
    config: AdapterConfig,
    backend: B,
}

impl<B: EndpointBackend> Shared<B> {
    /// Make `device_id` the OS default for every configured role.
    fn apply_default_roles(&self, device_id: &str) {
        let Some(policy) = &self.policy else {
            return;
        };
        for &role in &self.config.default_roles {
            if let Err(e) = policy.set_default_endpoint(device_id, role) {
                warn!(device_id, ?role, error = %e, "Failed to set default endpoint");
            }
        }
    }

    /// Returns true if the cached recording device changed.
    fn follow_default_recording(&self, device_id: Option<&str>) -> bool {
        let device = device_id.and_then(|id| self.backend.device(id).ok());

        let mut mic = lock(&self.mic);
        if same_device(device.as_ref(), mic.device.as_ref()) {
            return false;
        }

        match device {
            Some(device) => {
                let volume = activate_volume(&self.backend, &device);
                mic.replace(Some(device), volume);
            }
            None => {
                warn!(
                    device_id = device_id.unwrap_or_default(),
                    "Could not find recording device"
                );
                mic.clear();
            }
        }
        true
    }

    /// Returns true if the cached playback device changed.
    fn follow_default_playback(&self, device_id: Option<&str>) -> bool {
        let device = device_id.and_then(|id| self.backend.device(id).ok());

        let mut playback = lock(&self.playback);
        if same_device(device.as_ref(), playback.as_ref()) {
            return false;
        }

        if device.is_none() {
            warn!(
                device_id = device_id.unwrap_or_default(),
                "Could not find playback device"
            );
        }
        *playback = None;
        *playback = device;
        true
    }

    fn devices(&self, flow: DataFlow) -> Vec<DeviceInfo> {
        let devices = match self.backend.active_devices(flow) {
            Ok(devices) => devices,
            Err(e) => {
                warn!(?flow, error = %e, "Failed to enumerate audio endpoints");
                return Vec::new();
            }
        };

        devices
            .iter()
            .filter_map(|device| match device.id() {
                Ok(id) if !id.is_empty() => Some(DeviceInfo {
                    id,
                    name: device.name().unwrap_or_default(),
                }),
                _ => {
                    debug!(?flow, "Skipping endpoint without a readable ID");
                    None
                }
            })
            .collect()
    }

    fn release_devices(&self) {
        lock(&self.mirror).clear();
        lock(&self.mic).clear();
        *lock(&self.playback) = None;
    }
}

impl<B: EndpointBackend> EndpointEventSink for Shared<B> {
    fn on_endpoint_event(&self, event: EndpointEvent) {
        let tracked = self.config.tracked_role;
        match event {
            EndpointEvent::DeviceAdded { device_id } => {
                debug!(%device_id, "Endpoint added");
                self.controller.on_device_added();
            }
            EndpointEvent::DeviceRemoved { device_id } => {
                debug!(%device_id, "Endpoint removed");
                self.controller.on_device_removed();
            }
            EndpointEvent::DefaultDeviceChanged {
                flow: DataFlow::Capture,
                role,
                device_id,
            } if role == tracked => {
                debug!(?device_id, ?role, "Default recording device changed");
                if self.follow_default_recording(device_id.as_deref()) {
                    self.controller.on_new_recording_device();
                }
            }
            EndpointEvent::DefaultDeviceChanged {
                flow: DataFlow::Render,
                role,
                device_id,
            } if role == tracked => {
                debug!(?device_id, ?role, "Default playback device changed");
                if self.follow_default_playback(device_id.as_deref()) {
                    self.controller.on_new_playback_device();
                }
            }
            other => trace!(event = ?other, "Ignoring endpoint event"),
        }
    }
}

/// Adapter over the OS audio endpoints for one settings controller.
///
/// All methods are safe to call while OS notifications are being delivered on
/// another thread; each role is guarded by its own lock. Controller callbacks
/// run with no lock held, so a controller may call back into the adapter.
pub struct AudioManager<B: EndpointBackend> {
    registration: Option<B::Registration>,
    shared: Arc<Shared<B>>,
}

impl AudioManager<PlatformBackend> {
    /// Create the adapter over the native endpoint API of this platform.
    ///
    /// Fails if the device enumerator cannot be created. COM must already be
    /// initialized on the calling thread on Windows.
    pub fn new_platform(
        controller: Arc<dyn AudioController>,
        config: AdapterConfig,
    ) -> Result<Self, AudioError> {
        let backend = PlatformBackend::new()?;
        Ok(Self::init(backend, controller, config))
    }
}

impl<B: EndpointBackend> AudioManager<B> {
    /// Resolve the current defaults, probe the policy service and register
    /// for endpoint notifications.
    ///
    /// Missing defaults, a missing policy service and a failed registration
    /// are logged and leave the corresponding feature inert.
    pub fn init(backend: B, controller: Arc<dyn AudioController>, config: AdapterConfig) -> Self {
        let playback = match backend.default_device(DataFlow::Render, config.initial_role) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!(error = %e, "Could not find a default playback device");
                None
            }
        };

        let mut mic = VolumeSlot::empty();
        match backend.default_device(DataFlow::Capture, config.initial_role) {
            Ok(device) => {
                let volume = activate_volume(&backend, &device);
                mic.replace(Some(device), volume);
            }
            Err(e) => warn!(error = %e, "Could not find a default recording device"),
        }

        let policy = match backend.policy_config() {
            Ok(policy) => Some(policy),
            Err(e) => {
                error!(error = %e, "Could not find PolicyConfig interface");
                None
            }
        };

        let shared = Arc::new(Shared {
            mirror: Mutex::new(VolumeSlot::empty()),
            mic: Mutex::new(mic),
            playback: Mutex::new(playback),
            policy,
            controller,
            config,
            backend,
        });

        let sink: Arc<dyn EndpointEventSink> = shared.clone();
        let registration = match shared.backend.register(sink) {
            Ok(registration) => Some(registration),
            Err(e) => {
                error!(error = %e, "Endpoint notifications unavailable");
                None
            }
        };

        Self {
            registration,
            shared,
        }
    }

    /// Whether default-device selection is available.
    pub fn has_policy_config(&self) -> bool {
        self.shared.policy.is_some()
    }

    /// Whether the adapter is receiving endpoint notifications.
    pub fn is_listening(&self) -> bool {
        self.registration.is_some()
    }

    // Playback

    /// Select the playback device and make it the OS default.
    ///
    /// An empty or unknown ID leaves the current device in place. With
    /// `notify` the controller is told regardless of the outcome.
    pub fn set_playback_device(&self, device_id: &str, notify: bool) {
        if !device_id.is_empty() {
            match self.shared.backend.device(device_id) {
                Ok(device) => {
                    let id = device.id().unwrap_or_else(|_| device_id.to_string());
                    *lock(&self.shared.playback) = Some(device);
                    self.shared.apply_default_roles(&id);
                }
                Err(e) => warn!(device_id, error = %e, "Could not find playback device"),
            }
        }
        if notify {
            self.shared.controller.on_new_playback_device();
        }
    }

    pub fn playback_dev_name(&self) -> String {
        device_name(lock(&self.shared.playback).as_ref())
    }

    pub fn playback_dev_id(&self) -> String {
        device_id(lock(&self.shared.playback).as_ref())
    }

    // Mirror

    /// Select the mirror device; an empty ID clears it.
    ///
    /// The mirror never follows OS default changes.
    pub fn set_mirror_device(&self, device_id: &str, notify: bool) {
        if device_id.is_empty() {
            lock(&self.shared.mirror).clear();
        } else {
            match self.shared.backend.device(device_id) {
                Ok(device) => {
                    let volume = activate_volume(&self.shared.backend, &device);
                    lock(&self.shared.mirror).replace(Some(device), volume);
                }
                Err(e) => warn!(device_id, error = %e, "Could not find mirror device"),
            }
        }
        if notify {
            self.shared.controller.on_new_mirror_device();
        }
    }

    pub fn is_mirror_valid(&self) -> bool {
        lock(&self.shared.mirror).is_valid()
    }

    pub fn mirror_dev_name(&self) -> String {
        device_name(lock(&self.shared.mirror).device.as_ref())
    }

    pub fn mirror_dev_id(&self) -> String {
        device_id(lock(&self.shared.mirror).device.as_ref())
    }

    /// Mirror volume (0.0 to 1.0), or 0.0 without a volume control.
    pub fn mirror_volume(&self) -> f32 {
        lock(&self.shared.mirror).volume_level()
    }

    /// Returns whether the OS accepted the new level.
    pub fn set_mirror_volume(&self, level: f32) -> bool {
        lock(&self.shared.mirror).set_volume_level(level)
    }

    pub fn mirror_muted(&self) -> bool {
        lock(&self.shared.mirror).muted()
    }

    pub fn set_mirror_muted(&self, muted: bool) -> bool {
        lock(&self.shared.mirror).set_muted(muted)
    }

    // Microphone

    pub fn is_mic_valid(&self) -> bool {
        lock(&self.shared.mic).is_valid()
    }

    /// Select the recording device and make it the OS default.
    ///
    /// An empty or unknown ID leaves the current device in place. With
    /// `notify` the controller is told regardless of the outcome.
    pub fn set_mic_device(&self, device_id: &str, notify: bool) {
        if !device_id.is_empty() {
            match self.shared.backend.device(device_id) {
                Ok(device) => {
                    let id = device.id().unwrap_or_else(|_| device_id.to_string());
                    let volume = activate_volume(&self.shared.backend, &device);
                    lock(&self.shared.mic).replace(Some(device), volume);
                    self.shared.apply_default_roles(&id);
                }
                Err(e) => warn!(device_id, error = %e, "Could not find recording device"),
            }
        }
        if notify {
            self.shared.controller.on_new_recording_device();
        }
    }

    pub fn mic_dev_name(&self) -> String {
        device_name(lock(&self.shared.mic).device.as_ref())
    }

    pub fn mic_dev_id(&self) -> String {
        device_id(lock(&self.shared.mic).device.as_ref())
    }

    /// Microphone volume (0.0 to 1.0), or 0.0 without a volume control.
    pub fn mic_volume(&self) -> f32 {
        lock(&self.shared.mic).volume_level()
    }

    /// Returns whether the OS accepted the new level.
    pub fn set_mic_volume(&self, level: f32) -> bool {
        lock(&self.shared.mic).set_volume_level(level)
    }

    pub fn mic_muted(&self) -> bool {
        lock(&self.shared.mic).muted()
    }

    pub fn set_mic_muted(&self, muted: bool) -> bool {
        lock(&self.shared.mic).set_muted(muted)
    }

    // Enumeration

    /// Active recording endpoints in OS order.
    pub fn recording_devices(&self) -> Vec<DeviceInfo> {
        self.shared.devices(DataFlow::Capture)
    }

    /// Active playback endpoints in OS order.
    pub fn playback_devices(&self) -> Vec<DeviceInfo> {
        self.shared.devices(DataFlow::Render)
    }
}

impl<B: EndpointBackend> Drop for AudioManager<B> {
    fn drop(&mut self) {
        // Unregister before releasing the cached handles
        drop(self.registration.take());
        self.shared.release_devices();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::controller::{create_event_channel, ChannelController, ControllerEvent};
    use crate::audio::device::DeviceRole;
    use crate::audio::mock::MockBackend;
    use std::sync::mpsc::Receiver;
    use std::sync::Weak;

    const SPEAKERS: &str = "{0.0.0.00000000}.{speakers}";
    const HEADSET_OUT: &str = "{0.0.0.00000000}.{headset-out}";
    const HDMI: &str = "{0.0.0.00000000}.{hdmi}";
    const DESK_MIC: &str = "{0.0.1.00000000}.{desk-mic}";
    const HEADSET_MIC: &str = "{0.0.1.00000000}.{headset-mic}";

    fn backend() -> MockBackend {
        MockBackend::new()
            .with_device(SPEAKERS, "Speakers (Realtek Audio)", DataFlow::Render)
            .with_device(HEADSET_OUT, "Headphones (Index HMD)", DataFlow::Render)
            .with_device(HDMI, "LG TV (NVIDIA High Definition Audio)", DataFlow::Render)
            .with_device(DESK_MIC, "Microphone (Yeti)", DataFlow::Capture)
            .with_device(HEADSET_MIC, "Microphone (Index HMD)", DataFlow::Capture)
            .with_default_for_all_roles(DataFlow::Render, SPEAKERS)
            .with_default_for_all_roles(DataFlow::Capture, DESK_MIC)
    }

    fn manager(backend: &MockBackend) -> (AudioManager<MockBackend>, Receiver<ControllerEvent>) {
        let (tx, rx) = create_event_channel();
        let manager = AudioManager::init(
            backend.clone(),
            Arc::new(ChannelController::new(tx)),
            AdapterConfig::default(),
        );
        (manager, rx)
    }

    fn drain(rx: &Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
        rx.try_iter().collect()
    }

    /// Shared buffer for log lines written by a test subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            lock(&self.0).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&lock(&self.0)).into_owned()
        }
    }

    /// Run `f` with warnings and errors on this thread captured.
    fn capture_warnings(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.contents()
    }

    #[test]
    fn test_init_resolves_defaults() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        assert_eq!(manager.playback_dev_id(), SPEAKERS);
        assert_eq!(manager.playback_dev_name(), "Speakers (Realtek Audio)");
        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert!(manager.is_mic_valid());
        assert!(!manager.is_mirror_valid());
        assert!(manager.has_policy_config());
        assert!(manager.is_listening());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_init_uses_initial_role() {
        let backend =
            backend().with_default(DataFlow::Capture, DeviceRole::Communications, HEADSET_MIC);
        let (manager, _rx) = manager(&backend);
        assert_eq!(manager.mic_dev_id(), HEADSET_MIC);
    }

    #[test]
    fn test_init_without_defaults_is_inert() {
        let backend = MockBackend::new()
            .with_device(DESK_MIC, "Microphone (Yeti)", DataFlow::Capture)
            .without_policy_config();
        let (manager, _rx) = manager(&backend);

        assert_eq!(manager.playback_dev_id(), "");
        assert_eq!(manager.playback_dev_name(), "");
        assert_eq!(manager.mic_dev_id(), "");
        assert!(!manager.is_mic_valid());
        assert!(!manager.has_policy_config());
    }

    #[test]
    fn test_sentinels_without_volume_control() {
        let backend = MockBackend::new();
        let (manager, _rx) = manager(&backend);

        assert_eq!(manager.mic_volume(), 0.0);
        assert!(!manager.set_mic_volume(0.5));
        assert!(!manager.mic_muted());
        assert!(!manager.set_mic_muted(true));

        assert_eq!(manager.mirror_volume(), 0.0);
        assert!(!manager.set_mirror_volume(0.5));
        assert!(!manager.mirror_muted());
        assert!(!manager.set_mirror_muted(true));
    }

    #[test]
    fn test_mic_volume_and_mute_forward_to_os() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);

        assert!(manager.set_mic_volume(0.25));
        assert_eq!(manager.mic_volume(), 0.25);
        assert_eq!(backend.volume_of(DESK_MIC), 0.25);

        assert!(manager.set_mic_muted(true));
        assert!(manager.mic_muted());
        assert!(backend.is_muted(DESK_MIC));
    }

    #[test]
    fn test_out_of_range_volume_is_rejected_by_os() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);

        assert!(manager.set_mic_volume(0.3));
        assert!(!manager.set_mic_volume(7.0));
        assert_eq!(manager.mic_volume(), 0.3);
        assert!(!manager.set_mic_volume(-0.5));
        assert!(!manager.set_mic_volume(f32::NAN));
        assert_eq!(backend.volume_of(DESK_MIC), 0.3);

        manager.set_mirror_device(HDMI, false);
        assert!(manager.set_mirror_volume(1.0));
        assert!(!manager.set_mirror_volume(1.01));
        assert_eq!(backend.volume_of(HDMI), 1.0);
    }

    #[test]
    fn test_os_volume_failure_reports_false() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);

        backend.fail_volume_calls(DESK_MIC);
        assert!(manager.is_mic_valid());
        assert!(!manager.set_mic_volume(0.5));
        assert!(!manager.set_mic_muted(true));
        assert_eq!(manager.mic_volume(), 0.0);
    }

    #[test]
    fn test_set_mic_device_updates_role_and_policy() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        manager.set_mic_device(HEADSET_MIC, true);

        assert_eq!(manager.mic_dev_id(), HEADSET_MIC);
        assert_eq!(manager.mic_dev_name(), "Microphone (Index HMD)");
        assert!(manager.is_mic_valid());
        assert_eq!(
            backend.policy_calls(),
            vec![(HEADSET_MIC.to_string(), DeviceRole::Console)]
        );
        assert_eq!(drain(&rx), vec![ControllerEvent::NewRecordingDevice]);

        // Volume control follows the new device
        assert!(manager.set_mic_volume(0.4));
        assert_eq!(backend.volume_of(HEADSET_MIC), 0.4);
        assert_ne!(backend.volume_of(DESK_MIC), 0.4);
    }

    #[test]
    fn test_set_playback_device_updates_role_and_policy() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        manager.set_playback_device(HEADSET_OUT, false);

        assert_eq!(manager.playback_dev_id(), HEADSET_OUT);
        assert_eq!(manager.playback_dev_name(), "Headphones (Index HMD)");
        assert_eq!(
            backend.policy_calls(),
            vec![(HEADSET_OUT.to_string(), DeviceRole::Console)]
        );
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_selection_writes_every_configured_role() {
        let backend = backend();
        let (tx, _rx) = create_event_channel();
        let config = AdapterConfig {
            default_roles: vec![DeviceRole::Console, DeviceRole::Communications],
            ..AdapterConfig::default()
        };
        let manager =
            AudioManager::init(backend.clone(), Arc::new(ChannelController::new(tx)), config);

        manager.set_playback_device(HDMI, false);

        assert_eq!(
            backend.policy_calls(),
            vec![
                (HDMI.to_string(), DeviceRole::Console),
                (HDMI.to_string(), DeviceRole::Communications),
            ]
        );
    }

    #[test]
    fn test_selection_without_policy_still_switches_cache() {
        let backend = backend().without_policy_config();
        let (manager, _rx) = manager(&backend);

        manager.set_playback_device(HDMI, false);

        assert_eq!(manager.playback_dev_id(), HDMI);
        assert!(backend.policy_calls().is_empty());
    }

    #[test]
    fn test_unknown_id_preserves_state_and_still_notifies() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        manager.set_mic_device("{0.0.1.00000000}.{missing}", true);
        manager.set_playback_device("{0.0.0.00000000}.{missing}", true);

        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert_eq!(manager.playback_dev_id(), SPEAKERS);
        assert!(backend.policy_calls().is_empty());
        assert_eq!(
            drain(&rx),
            vec![
                ControllerEvent::NewRecordingDevice,
                ControllerEvent::NewPlaybackDevice
            ]
        );
    }

    #[test]
    fn test_unknown_id_is_logged_as_warning() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);

        let logs = capture_warnings(|| {
            manager.set_mic_device("{0.0.1.00000000}.{missing}", false);
            manager.set_playback_device("{0.0.0.00000000}.{gone}", false);
            manager.set_mirror_device("{0.0.0.00000000}.{absent}", false);
        });

        let warnings: Vec<&str> = logs.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 3, "{logs}");
        assert!(warnings[0].contains("Could not find recording device"));
        assert!(warnings[0].contains("{missing}"));
        assert!(warnings[1].contains("Could not find playback device"));
        assert!(warnings[2].contains("Could not find mirror device"));

        // Valid selections stay quiet
        let logs = capture_warnings(|| manager.set_mic_device(HEADSET_MIC, false));
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_empty_id_is_a_no_op_for_default_roles() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        manager.set_mic_device("", true);
        manager.set_playback_device("", false);

        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert_eq!(manager.playback_dev_id(), SPEAKERS);
        assert_eq!(drain(&rx), vec![ControllerEvent::NewRecordingDevice]);
    }

    #[test]
    fn test_mirror_select_and_clear() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        manager.set_mirror_device(HEADSET_OUT, true);
        assert!(manager.is_mirror_valid());
        assert_eq!(manager.mirror_dev_id(), HEADSET_OUT);
        assert_eq!(manager.mirror_dev_name(), "Headphones (Index HMD)");
        assert!(manager.set_mirror_volume(0.8));
        assert_eq!(manager.mirror_volume(), 0.8);
        assert!(manager.set_mirror_muted(true));
        assert!(manager.mirror_muted());

        manager.set_mirror_device("", true);
        assert!(!manager.is_mirror_valid());
        assert_eq!(manager.mirror_dev_id(), "");
        assert_eq!(manager.mirror_dev_name(), "");
        assert_eq!(manager.mirror_volume(), 0.0);
        assert!(!manager.set_mirror_volume(0.5));
        assert!(!manager.set_mirror_muted(false));
        assert_eq!(backend.live_handles(HEADSET_OUT), 0);

        assert_eq!(
            drain(&rx),
            vec![ControllerEvent::NewMirrorDevice, ControllerEvent::NewMirrorDevice]
        );
        // Mirror selection never touches the OS default
        assert!(backend.policy_calls().is_empty());
    }

    #[test]
    fn test_mirror_unknown_id_keeps_existing_mirror() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);

        manager.set_mirror_device(HDMI, false);
        manager.set_mirror_device("{0.0.0.00000000}.{missing}", false);

        assert_eq!(manager.mirror_dev_id(), HDMI);
        assert!(manager.is_mirror_valid());
    }

    #[test]
    fn test_mirror_without_volume_control_is_invalid() {
        let backend = backend().with_volume_unavailable(HDMI);
        let (manager, _rx) = manager(&backend);

        manager.set_mirror_device(HDMI, false);

        assert_eq!(manager.mirror_dev_id(), HDMI);
        assert!(!manager.is_mirror_valid());
        assert_eq!(manager.mirror_volume(), 0.0);
    }

    #[test]
    fn test_enumeration_lists_active_devices_in_os_order() {
        let backend = backend()
            .with_device("{0.0.0.00000000}.{unplugged}", "Old Speakers", DataFlow::Render)
            .with_state("{0.0.0.00000000}.{unplugged}", crate::audio::DeviceState::Unplugged)
            .with_device("{0.0.1.00000000}.{nameless}", "", DataFlow::Capture);
        let (manager, _rx) = manager(&backend);

        let playback = manager.playback_devices();
        assert_eq!(
            playback,
            vec![
                DeviceInfo::new(SPEAKERS, "Speakers (Realtek Audio)"),
                DeviceInfo::new(HEADSET_OUT, "Headphones (Index HMD)"),
                DeviceInfo::new(HDMI, "LG TV (NVIDIA High Definition Audio)"),
            ]
        );

        let recording = manager.recording_devices();
        assert_eq!(recording.len(), 3);
        assert!(recording.iter().all(|d| !d.id.is_empty()));
        assert_eq!(recording[2], DeviceInfo::new("{0.0.1.00000000}.{nameless}", ""));
    }

    #[test]
    fn test_enumeration_failure_yields_empty_list() {
        let backend = backend().with_enumeration_failure();
        let (manager, _rx) = manager(&backend);
        assert!(manager.playback_devices().is_empty());
        assert!(manager.recording_devices().is_empty());
    }

    #[test]
    fn test_default_capture_change_follows_new_device() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Capture,
            role: DeviceRole::Multimedia,
            device_id: Some(HEADSET_MIC.to_string()),
        });

        assert_eq!(manager.mic_dev_id(), HEADSET_MIC);
        assert!(manager.is_mic_valid());
        assert_eq!(backend.live_handles(DESK_MIC), 0);
        assert_eq!(drain(&rx), vec![ControllerEvent::NewRecordingDevice]);
    }

    #[test]
    fn test_default_capture_change_to_cached_device_is_ignored() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Capture,
            role: DeviceRole::Multimedia,
            device_id: Some(DESK_MIC.to_string()),
        });

        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert_eq!(backend.live_handles(DESK_MIC), 1);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_default_change_for_other_roles_is_ignored() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        for role in [DeviceRole::Console, DeviceRole::Communications] {
            backend.fire(EndpointEvent::DefaultDeviceChanged {
                flow: DataFlow::Capture,
                role,
                device_id: Some(HEADSET_MIC.to_string()),
            });
        }

        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_default_render_change_follows_new_device() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Render,
            role: DeviceRole::Multimedia,
            device_id: Some(HEADSET_OUT.to_string()),
        });
        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Render,
            role: DeviceRole::Multimedia,
            device_id: Some(HEADSET_OUT.to_string()),
        });

        assert_eq!(manager.playback_dev_id(), HEADSET_OUT);
        assert_eq!(backend.live_handles(SPEAKERS), 0);
        assert_eq!(drain(&rx), vec![ControllerEvent::NewPlaybackDevice]);
    }

    #[test]
    fn test_default_change_to_unknown_device_clears_role() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Capture,
            role: DeviceRole::Multimedia,
            device_id: None,
        });

        assert_eq!(manager.mic_dev_id(), "");
        assert!(!manager.is_mic_valid());
        assert_eq!(manager.mic_volume(), 0.0);
        assert_eq!(backend.live_handles(DESK_MIC), 0);
        assert_eq!(drain(&rx), vec![ControllerEvent::NewRecordingDevice]);

        // A second report of "no default" changes nothing
        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Capture,
            role: DeviceRole::Multimedia,
            device_id: None,
        });
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_default_change_never_touches_mirror() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);
        manager.set_mirror_device(HDMI, false);

        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Render,
            role: DeviceRole::Multimedia,
            device_id: Some(HEADSET_OUT.to_string()),
        });

        assert_eq!(manager.mirror_dev_id(), HDMI);
        assert!(manager.is_mirror_valid());
    }

    #[test]
    fn test_hot_plug_events_forward_once_each() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        backend.fire(EndpointEvent::DeviceAdded {
            device_id: HEADSET_MIC.to_string(),
        });
        backend.fire(EndpointEvent::DeviceRemoved {
            device_id: DESK_MIC.to_string(),
        });

        assert_eq!(
            drain(&rx),
            vec![ControllerEvent::DeviceAdded, ControllerEvent::DeviceRemoved]
        );
        // Removal does not drop the cached handle
        assert_eq!(manager.mic_dev_id(), DESK_MIC);
    }

    #[test]
    fn test_state_and_property_events_are_ignored() {
        let backend = backend();
        let (manager, rx) = manager(&backend);

        backend.fire(EndpointEvent::DeviceStateChanged {
            device_id: DESK_MIC.to_string(),
            new_state: crate::audio::DeviceState::Disabled,
        });
        backend.fire(EndpointEvent::PropertyValueChanged {
            device_id: DESK_MIC.to_string(),
        });

        assert!(drain(&rx).is_empty());
        assert_eq!(manager.mic_dev_id(), DESK_MIC);
    }

    #[test]
    fn test_reselecting_device_leaks_no_handles() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);

        manager.set_mic_device(HEADSET_MIC, false);
        manager.set_mic_device(DESK_MIC, false);
        manager.set_mirror_device(HEADSET_OUT, false);
        manager.set_mirror_device(HDMI, false);
        manager.set_mirror_device(HEADSET_OUT, false);

        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert_eq!(manager.mic_dev_name(), "Microphone (Yeti)");
        assert_eq!(backend.live_handles(DESK_MIC), 1);
        assert_eq!(backend.live_volumes(DESK_MIC), 1);
        assert_eq!(backend.live_handles(HEADSET_MIC), 0);
        assert_eq!(backend.live_volumes(HEADSET_MIC), 0);
        assert_eq!(backend.live_handles(HDMI), 0);
        assert_eq!(backend.live_volumes(HDMI), 0);
        assert_eq!(manager.mirror_dev_id(), HEADSET_OUT);
        assert_eq!(backend.live_handles(HEADSET_OUT), 1);
    }

    #[test]
    fn test_teardown_unregisters_and_releases_everything() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);
        manager.set_mirror_device(HDMI, false);
        assert!(backend.is_registered());

        drop(manager);

        assert!(!backend.is_registered());
        assert_eq!(backend.unregister_count(), 1);
        assert_eq!(backend.total_live_handles(), 0);
        assert_eq!(backend.total_live_volumes(), 0);
    }

    #[test]
    fn test_registration_failure_is_not_fatal() {
        let backend = backend().with_registration_failure();
        let (manager, _rx) = manager(&backend);

        assert!(!manager.is_listening());
        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert!(!backend.fire(EndpointEvent::DeviceAdded {
            device_id: HDMI.to_string(),
        }));
    }

    /// Controller that reads the adapter back from inside its callbacks.
    struct ReentrantController {
        manager: Mutex<Weak<AudioManager<MockBackend>>>,
        seen: Mutex<Vec<String>>,
    }

    impl ReentrantController {
        fn record(&self) {
            if let Some(manager) = lock(&self.manager).upgrade() {
                lock(&self.seen).push(manager.mic_dev_name());
            }
        }
    }

    impl AudioController for ReentrantController {
        fn on_new_playback_device(&self) {}
        fn on_new_recording_device(&self) {
            self.record();
        }
        fn on_new_mirror_device(&self) {}
        fn on_device_added(&self) {}
        fn on_device_removed(&self) {}
    }

    #[test]
    fn test_controller_may_reenter_adapter() {
        let backend = backend();
        let controller = Arc::new(ReentrantController {
            manager: Mutex::new(Weak::new()),
            seen: Mutex::new(Vec::new()),
        });
        let manager = Arc::new(AudioManager::init(
            backend.clone(),
            controller.clone(),
            AdapterConfig::default(),
        ));
        *lock(&controller.manager) = Arc::downgrade(&manager);

        manager.set_mic_device(HEADSET_MIC, true);
        backend.fire(EndpointEvent::DefaultDeviceChanged {
            flow: DataFlow::Capture,
            role: DeviceRole::Multimedia,
            device_id: Some(DESK_MIC.to_string()),
        });

        assert_eq!(
            *lock(&controller.seen),
            vec!["Microphone (Index HMD)".to_string(), "Microphone (Yeti)".to_string()]
        );
    }

    #[test]
    fn test_notifications_race_with_accessors() {
        let backend = backend();
        let (manager, _rx) = manager(&backend);
        let manager = Arc::new(manager);

        let notifier = {
            let backend = backend.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let id = if i % 2 == 0 { HEADSET_MIC } else { DESK_MIC };
                    backend.fire(EndpointEvent::DefaultDeviceChanged {
                        flow: DataFlow::Capture,
                        role: DeviceRole::Multimedia,
                        device_id: Some(id.to_string()),
                    });
                }
            })
        };

        for _ in 0..200 {
            let id = manager.mic_dev_id();
            assert!(id == DESK_MIC || id == HEADSET_MIC);
            assert!(manager.set_mic_volume(0.5));
        }
        notifier.join().unwrap();

        assert_eq!(manager.mic_dev_id(), DESK_MIC);
        assert_eq!(backend.live_handles(HEADSET_MIC), 0);
        assert_eq!(backend.live_volumes(HEADSET_MIC), 0);
    }
}
