//! In-memory endpoint backend.
//!
//! Models a small set of endpoints with scripted defaults and counts every
//! live device handle and volume proxy, so tests can check that the adapter
//! releases what it replaces. Clones share state, which lets a test keep a
//! handle on the backend after moving it into an adapter.

use super::backend::{
    DefaultEndpointPolicy, EndpointBackend, EndpointDevice, EndpointEventSink, EndpointVolume,
};
use super::device::{AudioError, DataFlow, DeviceRole, DeviceState, EndpointEvent};
use super::lock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// HRESULT the endpoint volume API returns for levels outside [0, 1].
const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

const ALL_ROLES: [DeviceRole; 3] = [
    DeviceRole::Console,
    DeviceRole::Multimedia,
    DeviceRole::Communications,
];

#[derive(Debug, Clone)]
struct MockEndpoint {
    id: String,
    name: String,
    flow: DataFlow,
    state: DeviceState,
}

#[derive(Default)]
struct MockState {
    endpoints: Mutex<Vec<MockEndpoint>>,
    defaults: Mutex<HashMap<(DataFlow, DeviceRole), String>>,
    levels: Mutex<HashMap<String, (f32, bool)>>,
    live_devices: Mutex<HashMap<String, usize>>,
    live_volumes: Mutex<HashMap<String, usize>>,
    no_volume: Mutex<HashSet<String>>,
    failing_volume: Mutex<HashSet<String>>,
    policy_calls: Mutex<Vec<(String, DeviceRole)>>,
    sink: Mutex<Option<Arc<dyn EndpointEventSink>>>,
    no_policy: AtomicBool,
    enumeration_fails: AtomicBool,
    registration_fails: AtomicBool,
    unregistrations: AtomicUsize,
}

impl MockState {
    fn open(self: &Arc<Self>, endpoint: &MockEndpoint) -> MockDevice {
        *lock(&self.live_devices).entry(endpoint.id.clone()).or_default() += 1;
        MockDevice {
            id: endpoint.id.clone(),
            name: endpoint.name.clone(),
            state: Arc::clone(self),
        }
    }

    fn find(&self, device_id: &str) -> Option<MockEndpoint> {
        lock(&self.endpoints)
            .iter()
            .find(|e| e.id == device_id)
            .cloned()
    }

    fn check_volume(&self, device_id: &str) -> Result<(), AudioError> {
        if lock(&self.failing_volume).contains(device_id) {
            Err(AudioError::Os {
                code: 0x8889_0004_u32 as i32,
                message: "AUDCLNT_E_DEVICE_INVALIDATED".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn release(counts: &Mutex<HashMap<String, usize>>, id: &str) {
    if let Some(count) = lock(counts).get_mut(id) {
        *count = count.saturating_sub(1);
    }
}

/// Fake device enumerator.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active endpoint at the end of the enumeration order.
    pub fn with_device(self, id: &str, name: &str, flow: DataFlow) -> Self {
        lock(&self.state.endpoints).push(MockEndpoint {
            id: id.to_string(),
            name: name.to_string(),
            flow,
            state: DeviceState::Active,
        });
        lock(&self.state.levels).insert(id.to_string(), (1.0, false));
        self
    }

    pub fn with_state(self, id: &str, state: DeviceState) -> Self {
        if let Some(endpoint) = lock(&self.state.endpoints).iter_mut().find(|e| e.id == id) {
            endpoint.state = state;
        }
        self
    }

    pub fn with_default(self, flow: DataFlow, role: DeviceRole, id: &str) -> Self {
        lock(&self.state.defaults).insert((flow, role), id.to_string());
        self
    }

    pub fn with_default_for_all_roles(self, flow: DataFlow, id: &str) -> Self {
        ALL_ROLES
            .into_iter()
            .fold(self, |backend, role| backend.with_default(flow, role, id))
    }

    /// Endpoint whose volume control cannot be activated.
    pub fn with_volume_unavailable(self, id: &str) -> Self {
        lock(&self.state.no_volume).insert(id.to_string());
        self
    }

    pub fn without_policy_config(self) -> Self {
        self.state.no_policy.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_enumeration_failure(self) -> Self {
        self.state.enumeration_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_registration_failure(self) -> Self {
        self.state.registration_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Make every volume call on an already activated proxy fail.
    pub fn fail_volume_calls(&self, id: &str) {
        lock(&self.state.failing_volume).insert(id.to_string());
    }

    /// Deliver an event to the registered sink, as the OS would.
    ///
    /// Returns false if nothing is registered.
    pub fn fire(&self, event: EndpointEvent) -> bool {
        let sink = lock(&self.state.sink).clone();
        match sink {
            Some(sink) => {
                sink.on_endpoint_event(event);
                true
            }
            None => false,
        }
    }

    pub fn volume_of(&self, id: &str) -> f32 {
        lock(&self.state.levels).get(id).map_or(0.0, |l| l.0)
    }

    pub fn is_muted(&self, id: &str) -> bool {
        lock(&self.state.levels).get(id).is_some_and(|l| l.1)
    }

    /// Every `(device_id, role)` passed to the policy service so far.
    pub fn policy_calls(&self) -> Vec<(String, DeviceRole)> {
        lock(&self.state.policy_calls).clone()
    }

    /// Live device handles for one endpoint.
    pub fn live_handles(&self, id: &str) -> usize {
        lock(&self.state.live_devices).get(id).copied().unwrap_or(0)
    }

    /// Live volume proxies for one endpoint.
    pub fn live_volumes(&self, id: &str) -> usize {
        lock(&self.state.live_volumes).get(id).copied().unwrap_or(0)
    }

    pub fn total_live_handles(&self) -> usize {
        lock(&self.state.live_devices).values().sum()
    }

    pub fn total_live_volumes(&self) -> usize {
        lock(&self.state.live_volumes).values().sum()
    }

    pub fn is_registered(&self) -> bool {
        lock(&self.state.sink).is_some()
    }

    pub fn unregister_count(&self) -> usize {
        self.state.unregistrations.load(Ordering::SeqCst)
    }
}

pub struct MockDevice {
    id: String,
    name: String,
    state: Arc<MockState>,
}

impl EndpointDevice for MockDevice {
    fn id(&self) -> Result<String, AudioError> {
        Ok(self.id.clone())
    }

    fn name(&self) -> Result<String, AudioError> {
        Ok(self.name.clone())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        release(&self.state.live_devices, &self.id);
    }
}

pub struct MockVolume {
    id: String,
    state: Arc<MockState>,
}

impl EndpointVolume for MockVolume {
    fn volume(&self) -> Result<f32, AudioError> {
        self.state.check_volume(&self.id)?;
        Ok(lock(&self.state.levels).get(&self.id).map_or(0.0, |l| l.0))
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        self.state.check_volume(&self.id)?;
        if !(0.0..=1.0).contains(&level) {
            return Err(AudioError::Os {
                code: E_INVALIDARG,
                message: "The parameter is incorrect.".to_string(),
            });
        }
        lock(&self.state.levels).entry(self.id.clone()).or_insert((1.0, false)).0 = level;
        Ok(())
    }

    fn muted(&self) -> Result<bool, AudioError> {
        self.state.check_volume(&self.id)?;
        Ok(lock(&self.state.levels).get(&self.id).is_some_and(|l| l.1))
    }

    fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        self.state.check_volume(&self.id)?;
        lock(&self.state.levels).entry(self.id.clone()).or_insert((1.0, false)).1 = muted;
        Ok(())
    }
}

impl Drop for MockVolume {
    fn drop(&mut self) {
        release(&self.state.live_volumes, &self.id);
    }
}

pub struct MockPolicy {
    state: Arc<MockState>,
}

impl DefaultEndpointPolicy for MockPolicy {
    fn set_default_endpoint(&self, device_id: &str, role: DeviceRole) -> Result<(), AudioError> {
        let endpoint = self
            .state
            .find(device_id)
            .ok_or_else(|| AudioError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;
        lock(&self.state.defaults).insert((endpoint.flow, role), endpoint.id);
        lock(&self.state.policy_calls).push((device_id.to_string(), role));
        Ok(())
    }
}

pub struct MockRegistration {
    state: Arc<MockState>,
}

impl Drop for MockRegistration {
    fn drop(&mut self) {
        lock(&self.state.sink).take();
        self.state.unregistrations.fetch_add(1, Ordering::SeqCst);
    }
}

impl EndpointBackend for MockBackend {
    type Device = MockDevice;
    type Volume = MockVolume;
    type Policy = MockPolicy;
    type Registration = MockRegistration;

    fn default_device(&self, flow: DataFlow, role: DeviceRole) -> Result<MockDevice, AudioError> {
        let id = lock(&self.state.defaults)
            .get(&(flow, role))
            .cloned()
            .ok_or(AudioError::NoDefaultDevice)?;
        self.device(&id)
    }

    fn device(&self, device_id: &str) -> Result<MockDevice, AudioError> {
        let endpoint = self
            .state
            .find(device_id)
            .ok_or_else(|| AudioError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;
        Ok(self.state.open(&endpoint))
    }

    fn active_devices(&self, flow: DataFlow) -> Result<Vec<MockDevice>, AudioError> {
        if self.state.enumeration_fails.load(Ordering::SeqCst) {
            return Err(AudioError::Os {
                code: 0x8007_000E_u32 as i32,
                message: "Out of memory".to_string(),
            });
        }
        let endpoints = lock(&self.state.endpoints).clone();
        Ok(endpoints
            .iter()
            .filter(|e| e.flow == flow && e.state == DeviceState::Active)
            .map(|e| self.state.open(e))
            .collect())
    }

    fn activate_volume(&self, device: &MockDevice) -> Result<MockVolume, AudioError> {
        if lock(&self.state.no_volume).contains(&device.id) {
            return Err(AudioError::VolumeNotAvailable);
        }
        *lock(&self.state.live_volumes).entry(device.id.clone()).or_default() += 1;
        Ok(MockVolume {
            id: device.id.clone(),
            state: Arc::clone(&self.state),
        })
    }

    fn policy_config(&self) -> Result<MockPolicy, AudioError> {
        if self.state.no_policy.load(Ordering::SeqCst) {
            return Err(AudioError::PolicyConfigUnavailable);
        }
        Ok(MockPolicy {
            state: Arc::clone(&self.state),
        })
    }

    fn register(&self, sink: Arc<dyn EndpointEventSink>) -> Result<MockRegistration, AudioError> {
        if self.state.registration_fails.load(Ordering::SeqCst) {
            return Err(AudioError::NotificationRegistration(
                "E_OUTOFMEMORY".to_string(),
            ));
        }
        *lock(&self.state.sink) = Some(sink);
        Ok(MockRegistration {
            state: Arc::clone(&self.state),
        })
    }
}
