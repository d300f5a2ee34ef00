//! FFI bindings for the audio endpoint adapter.
//!
//! This crate provides C ABI functions for the settings controller. The
//! controller passes a table of callbacks at creation time; the adapter
//! invokes them when the playback, recording or mirror device changes and
//! when endpoints are plugged in or removed.
//!
//! All functions use panic::catch_unwind to prevent Rust panics from
//! unwinding across the FFI boundary.

use audio_manager_rs::{
    AdapterConfig, AudioController, AudioError, AudioManager, DeviceInfo, PlatformBackend,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Error Handling
// ============================================================================

/// Error codes returned by FFI functions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidHandle = -1,
    InvalidArgument = -2,
    DeviceNotFound = -3,
    ComError = -4,
    JsonError = -5,
    VolumeNotAvailable = -6,
    UnsupportedPlatform = -7,
    EnumeratorUnavailable = -8,
    Panic = -99,
}

impl From<&AudioError> for ErrorCode {
    fn from(err: &AudioError) -> Self {
        match err {
            AudioError::DeviceNotFound { .. } => ErrorCode::DeviceNotFound,
            AudioError::VolumeNotAvailable => ErrorCode::VolumeNotAvailable,
            AudioError::UnsupportedPlatform => ErrorCode::UnsupportedPlatform,
            AudioError::EnumeratorUnavailable(_) => ErrorCode::EnumeratorUnavailable,
            AudioError::StringConversion(_) => ErrorCode::InvalidArgument,
            _ => ErrorCode::ComError,
        }
    }
}

/// Thread-local storage for the last error.
thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, String)>> = const { RefCell::new(None) };
}

fn set_last_error(code: ErrorCode, message: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some((code, message.into()));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for engine creation.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// tracing filter directive, e.g. "info" or "audio_manager_rs=debug"
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(flatten)]
    pub adapter: AdapterConfig,
}

const DEFAULT_LOG_LEVEL: &str = "info";

fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_new(level.unwrap_or(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    // A host that already installed a subscriber keeps it
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Parse the creation config. Null means defaults.
unsafe fn parse_config(config_json: *const c_char) -> Result<EngineConfig, String> {
    if config_json.is_null() {
        return Ok(EngineConfig::default());
    }
    let json = parse_c_str(config_json).ok_or_else(|| "config is not valid UTF-8".to_string())?;
    serde_json::from_str(json).map_err(|e| e.to_string())
}

// ============================================================================
// Controller Callbacks
// ============================================================================

/// Controller callback, invoked with the `user_data` pointer.
pub type ControllerCallback = Option<extern "C" fn(user_data: *mut c_void)>;

/// Callback table supplied by the controller. Any entry may be null.
///
/// Callbacks may be invoked from an OS notification thread.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AudioControllerCallbacks {
    pub user_data: *mut c_void,
    pub on_new_playback_device: ControllerCallback,
    pub on_new_recording_device: ControllerCallback,
    pub on_new_mirror_device: ControllerCallback,
    pub on_device_added: ControllerCallback,
    pub on_device_removed: ControllerCallback,
}

/// Forwards adapter notifications to the C callback table.
struct CallbackController {
    callbacks: AudioControllerCallbacks,
}

// SAFETY: the controller promises its callbacks and user_data tolerate
// invocation from any thread.
unsafe impl Send for CallbackController {}
unsafe impl Sync for CallbackController {}

impl CallbackController {
    fn invoke(&self, callback: ControllerCallback) {
        if let Some(callback) = callback {
            callback(self.callbacks.user_data);
        }
    }
}

impl AudioController for CallbackController {
    fn on_new_playback_device(&self) {
        self.invoke(self.callbacks.on_new_playback_device);
    }

    fn on_new_recording_device(&self) {
        self.invoke(self.callbacks.on_new_recording_device);
    }

    fn on_new_mirror_device(&self) {
        self.invoke(self.callbacks.on_new_mirror_device);
    }

    fn on_device_added(&self) {
        self.invoke(self.callbacks.on_device_added);
    }

    fn on_device_removed(&self) {
        self.invoke(self.callbacks.on_device_removed);
    }
}

// ============================================================================
// Data Types for JSON Serialization
// ============================================================================

/// Response containing a list of devices.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceInfo>,
}

fn devices_json(devices: Vec<DeviceInfo>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&DeviceListResponse { devices })
}

// ============================================================================
// Engine Handle Type
// ============================================================================

/// Opaque handle to the audio manager. Actually points to an Engine struct.
pub type AudioManagerHandle = *mut c_void;

/// Internal engine state.
struct Engine {
    manager: AudioManager<PlatformBackend>,
    // Dropped after the manager
    #[cfg(windows)]
    _com: audio_manager_rs::platform::ComGuard,
}

impl Engine {
    fn new(callbacks: AudioControllerCallbacks, config: AdapterConfig) -> Result<Self, AudioError> {
        #[cfg(windows)]
        let com = audio_manager_rs::platform::ComGuard::new(
            audio_manager_rs::platform::ComApartment::SingleThreaded,
        )?;

        let controller = Arc::new(CallbackController { callbacks });
        let manager = AudioManager::new_platform(controller, config)?;

        Ok(Self {
            manager,
            #[cfg(windows)]
            _com: com,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Allocate a C string from a Rust string. Caller must free with audio_manager_free_string.
fn alloc_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained a null byte, replace with empty
        Err(_) => CString::default().into_raw(),
    }
}

/// Parse a C string to a Rust string slice.
unsafe fn parse_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Run `f` against the engine behind `handle`.
///
/// A null handle or a panic records the error and yields `fallback`.
fn with_engine<T>(
    handle: AudioManagerHandle,
    fallback: T,
    what: &str,
    f: impl FnOnce(&Engine) -> T,
) -> T {
    clear_last_error();

    if handle.is_null() {
        set_last_error(ErrorCode::InvalidHandle, "Null engine handle");
        return fallback;
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: non-null handles come from audio_manager_create
        let engine = unsafe { &*(handle as *const Engine) };
        f(engine)
    }));

    match result {
        Ok(value) => value,
        Err(_) => {
            set_last_error(ErrorCode::Panic, format!("Panic during {what}"));
            fallback
        }
    }
}

/// Select a device by ID string; shared by the playback, mic and mirror setters.
fn select_device(
    handle: AudioManagerHandle,
    device_id: *const c_char,
    notify: bool,
    what: &str,
    select: impl FnOnce(&AudioManager<PlatformBackend>, &str, bool),
) -> i32 {
    let device_id = match unsafe { parse_c_str(device_id) } {
        Some(s) => s,
        None if device_id.is_null() => "",
        None => {
            set_last_error(ErrorCode::InvalidArgument, "Invalid device ID");
            return ErrorCode::InvalidArgument as i32;
        }
    };

    with_engine(handle, ErrorCode::InvalidHandle as i32, what, |engine| {
        select(&engine.manager, device_id, notify);
        ErrorCode::Success as i32
    })
}

fn string_result(
    handle: AudioManagerHandle,
    what: &str,
    get: impl FnOnce(&AudioManager<PlatformBackend>) -> String,
) -> *mut c_char {
    with_engine(handle, ptr::null_mut(), what, |engine| {
        alloc_c_string(&get(&engine.manager))
    })
}

fn device_list_result(
    handle: AudioManagerHandle,
    what: &str,
    list: impl FnOnce(&AudioManager<PlatformBackend>) -> Vec<DeviceInfo>,
) -> *mut c_char {
    with_engine(handle, ptr::null_mut(), what, |engine| {
        match devices_json(list(&engine.manager)) {
            Ok(json) => alloc_c_string(&json),
            Err(e) => {
                set_last_error(ErrorCode::JsonError, e.to_string());
                ptr::null_mut()
            }
        }
    })
}

// ============================================================================
// FFI Functions - Lifecycle
// ============================================================================

/// Create a new audio manager instance.
///
/// # Arguments
/// * `config_json` - JSON configuration string (can be null for defaults)
/// * `callbacks` - Controller callback table (copied)
///
/// # Returns
/// Handle to the engine, or null on failure. Check audio_manager_last_error_code() on failure.
///
/// # Safety
/// The returned handle must be freed with audio_manager_destroy() on the
/// creating thread.
#[no_mangle]
pub extern "C" fn audio_manager_create(
    config_json: *const c_char,
    callbacks: AudioControllerCallbacks,
) -> AudioManagerHandle {
    clear_last_error();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let (config, config_error) = match unsafe { parse_config(config_json) } {
            Ok(config) => (config, None),
            Err(e) => (EngineConfig::default(), Some(e)),
        };

        init_logging(config.log_level.as_deref());
        if let Some(e) = config_error {
            warn!(error = %e, "Invalid engine config, using defaults");
        }

        Engine::new(callbacks, config.adapter)
    }));

    match result {
        Ok(Ok(engine)) => Box::into_raw(Box::new(engine)) as AudioManagerHandle,
        Ok(Err(e)) => {
            set_last_error(ErrorCode::from(&e), e.to_string());
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(ErrorCode::Panic, "Panic during engine creation");
            ptr::null_mut()
        }
    }
}

/// Destroy an audio manager instance.
///
/// Unregisters from endpoint notifications before releasing device handles.
///
/// # Safety
/// The handle must have been created by audio_manager_create() and must not be used after this call.
#[no_mangle]
pub extern "C" fn audio_manager_destroy(handle: AudioManagerHandle) {
    if handle.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = Box::from_raw(handle as *mut Engine);
    });
}

// ============================================================================
// FFI Functions - Playback
// ============================================================================

/// Select the playback device and make it the OS default.
///
/// # Returns
/// 0 on success (including an unknown ID, which leaves the device unchanged),
/// negative error code on an invalid handle or argument.
#[no_mangle]
pub extern "C" fn audio_manager_set_playback_device(
    handle: AudioManagerHandle,
    device_id: *const c_char,
    notify: bool,
) -> i32 {
    select_device(handle, device_id, notify, "set playback device", |m, id, n| {
        m.set_playback_device(id, n)
    })
}

/// Caller must free the result with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_get_playback_dev_name(handle: AudioManagerHandle) -> *mut c_char {
    string_result(handle, "get playback name", |m| m.playback_dev_name())
}

/// Caller must free the result with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_get_playback_dev_id(handle: AudioManagerHandle) -> *mut c_char {
    string_result(handle, "get playback id", |m| m.playback_dev_id())
}

/// Whether selecting a device also changes the OS default.
#[no_mangle]
pub extern "C" fn audio_manager_has_policy_config(handle: AudioManagerHandle) -> bool {
    with_engine(handle, false, "policy check", |e| e.manager.has_policy_config())
}

// ============================================================================
// FFI Functions - Mirror
// ============================================================================

/// Select the mirror device; null or empty clears it.
#[no_mangle]
pub extern "C" fn audio_manager_set_mirror_device(
    handle: AudioManagerHandle,
    device_id: *const c_char,
    notify: bool,
) -> i32 {
    select_device(handle, device_id, notify, "set mirror device", |m, id, n| {
        m.set_mirror_device(id, n)
    })
}

#[no_mangle]
pub extern "C" fn audio_manager_is_mirror_valid(handle: AudioManagerHandle) -> bool {
    with_engine(handle, false, "mirror check", |e| e.manager.is_mirror_valid())
}

/// Caller must free the result with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_get_mirror_dev_name(handle: AudioManagerHandle) -> *mut c_char {
    string_result(handle, "get mirror name", |m| m.mirror_dev_name())
}

/// Caller must free the result with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_get_mirror_dev_id(handle: AudioManagerHandle) -> *mut c_char {
    string_result(handle, "get mirror id", |m| m.mirror_dev_id())
}

#[no_mangle]
pub extern "C" fn audio_manager_get_mirror_volume(handle: AudioManagerHandle) -> f32 {
    with_engine(handle, 0.0, "get mirror volume", |e| e.manager.mirror_volume())
}

#[no_mangle]
pub extern "C" fn audio_manager_set_mirror_volume(handle: AudioManagerHandle, volume: f32) -> bool {
    with_engine(handle, false, "set mirror volume", |e| {
        e.manager.set_mirror_volume(volume)
    })
}

#[no_mangle]
pub extern "C" fn audio_manager_get_mirror_muted(handle: AudioManagerHandle) -> bool {
    with_engine(handle, false, "get mirror mute", |e| e.manager.mirror_muted())
}

#[no_mangle]
pub extern "C" fn audio_manager_set_mirror_muted(handle: AudioManagerHandle, muted: bool) -> bool {
    with_engine(handle, false, "set mirror mute", |e| {
        e.manager.set_mirror_muted(muted)
    })
}

// ============================================================================
// FFI Functions - Microphone
// ============================================================================

#[no_mangle]
pub extern "C" fn audio_manager_is_mic_valid(handle: AudioManagerHandle) -> bool {
    with_engine(handle, false, "mic check", |e| e.manager.is_mic_valid())
}

/// Select the recording device and make it the OS default.
#[no_mangle]
pub extern "C" fn audio_manager_set_mic_device(
    handle: AudioManagerHandle,
    device_id: *const c_char,
    notify: bool,
) -> i32 {
    select_device(handle, device_id, notify, "set mic device", |m, id, n| {
        m.set_mic_device(id, n)
    })
}

/// Caller must free the result with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_get_mic_dev_name(handle: AudioManagerHandle) -> *mut c_char {
    string_result(handle, "get mic name", |m| m.mic_dev_name())
}

/// Caller must free the result with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_get_mic_dev_id(handle: AudioManagerHandle) -> *mut c_char {
    string_result(handle, "get mic id", |m| m.mic_dev_id())
}

#[no_mangle]
pub extern "C" fn audio_manager_get_mic_volume(handle: AudioManagerHandle) -> f32 {
    with_engine(handle, 0.0, "get mic volume", |e| e.manager.mic_volume())
}

#[no_mangle]
pub extern "C" fn audio_manager_set_mic_volume(handle: AudioManagerHandle, volume: f32) -> bool {
    with_engine(handle, false, "set mic volume", |e| e.manager.set_mic_volume(volume))
}

#[no_mangle]
pub extern "C" fn audio_manager_get_mic_muted(handle: AudioManagerHandle) -> bool {
    with_engine(handle, false, "get mic mute", |e| e.manager.mic_muted())
}

#[no_mangle]
pub extern "C" fn audio_manager_set_mic_muted(handle: AudioManagerHandle, muted: bool) -> bool {
    with_engine(handle, false, "set mic mute", |e| e.manager.set_mic_muted(muted))
}

// ============================================================================
// FFI Functions - Enumeration
// ============================================================================

/// Get all active recording devices.
///
/// # Returns
/// JSON `{"devices":[{"id":..,"name":..}]}`. Caller must free with audio_manager_free_string().
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn audio_manager_get_recording_devices(handle: AudioManagerHandle) -> *mut c_char {
    device_list_result(handle, "recording device enumeration", |m| {
        m.recording_devices()
    })
}

/// Get all active playback devices. Same format as the recording list.
#[no_mangle]
pub extern "C" fn audio_manager_get_playback_devices(handle: AudioManagerHandle) -> *mut c_char {
    device_list_result(handle, "playback device enumeration", |m| {
        m.playback_devices()
    })
}

// ============================================================================
// FFI Functions - Memory Management
// ============================================================================

/// Free a string allocated by this library.
///
/// # Safety
/// The pointer must have been returned by one of the audio_manager_* functions.
/// Do not call this on strings from other sources.
#[no_mangle]
pub extern "C" fn audio_manager_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }

    let _ = panic::catch_unwind(|| unsafe {
        let _ = CString::from_raw(ptr);
    });
}

// ============================================================================
// FFI Functions - Error Handling
// ============================================================================

/// Get the last error code.
///
/// # Returns
/// The error code from the last failed operation, or 0 if no error.
#[no_mangle]
pub extern "C" fn audio_manager_last_error_code() -> i32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(code, _)| *code as i32)
            .unwrap_or(0)
    })
}

/// Get the last error message.
///
/// # Returns
/// Error message string. Caller must free with audio_manager_free_string().
/// Returns null if no error.
#[no_mangle]
pub extern "C" fn audio_manager_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|(_, msg)| alloc_c_string(msg))
            .unwrap_or(ptr::null_mut())
    })
}

// ============================================================================
// FFI Functions - Utility
// ============================================================================

/// Get the library version.
///
/// # Returns
/// Version string. Caller must free with audio_manager_free_string().
#[no_mangle]
pub extern "C" fn audio_manager_version() -> *mut c_char {
    alloc_c_string(env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use audio_manager_rs::DeviceRole;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[cfg(not(windows))]
    fn no_callbacks() -> AudioControllerCallbacks {
        AudioControllerCallbacks {
            user_data: ptr::null_mut(),
            on_new_playback_device: None,
            on_new_recording_device: None,
            on_new_mirror_device: None,
            on_device_added: None,
            on_device_removed: None,
        }
    }

    fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        audio_manager_free_string(ptr);
        s
    }

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(
            ErrorCode::from(&AudioError::DeviceNotFound {
                device_id: "test".to_string()
            }),
            ErrorCode::DeviceNotFound
        );
        assert_eq!(
            ErrorCode::from(&AudioError::UnsupportedPlatform),
            ErrorCode::UnsupportedPlatform
        );
        assert_eq!(
            ErrorCode::from(&AudioError::EnumeratorUnavailable("E_NOINTERFACE".to_string())),
            ErrorCode::EnumeratorUnavailable
        );
        assert_eq!(
            ErrorCode::from(&AudioError::NoDefaultDevice),
            ErrorCode::ComError
        );
    }

    #[test]
    fn test_version() {
        let version = take_string(audio_manager_version());
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_null_handle_returns_sentinels() {
        let handle = ptr::null_mut();

        assert_eq!(audio_manager_get_mic_volume(handle), 0.0);
        assert_eq!(audio_manager_last_error_code(), ErrorCode::InvalidHandle as i32);
        assert!(!audio_manager_set_mic_volume(handle, 0.5));
        assert!(!audio_manager_set_mirror_muted(handle, true));
        assert!(!audio_manager_is_mic_valid(handle));
        assert!(!audio_manager_is_mirror_valid(handle));
        assert!(!audio_manager_has_policy_config(handle));
        assert!(audio_manager_get_mic_dev_name(handle).is_null());
        assert!(audio_manager_get_playback_devices(handle).is_null());
        assert_eq!(
            audio_manager_set_mic_device(handle, ptr::null(), false),
            ErrorCode::InvalidHandle as i32
        );

        let message = take_string(audio_manager_last_error_message());
        assert_eq!(message, "Null engine handle");

        audio_manager_destroy(handle);
    }

    #[test]
    fn test_invalid_device_id_is_rejected() {
        let bad = [0xC3u8, 0x28, 0x00];
        let code = audio_manager_set_playback_device(
            ptr::null_mut(),
            bad.as_ptr() as *const c_char,
            true,
        );
        assert_eq!(code, ErrorCode::InvalidArgument as i32);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_create_fails_off_windows() {
        let handle = audio_manager_create(ptr::null(), no_callbacks());
        assert!(handle.is_null());
        assert_eq!(
            audio_manager_last_error_code(),
            ErrorCode::UnsupportedPlatform as i32
        );
    }

    #[test]
    fn test_config_parsing() {
        let json = CString::new(
            r#"{"log_level":"debug","default_roles":["console","communications"]}"#,
        )
        .unwrap();
        let config = unsafe { parse_config(json.as_ptr()) }.unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(
            config.adapter.default_roles,
            vec![DeviceRole::Console, DeviceRole::Communications]
        );
        assert_eq!(config.adapter.tracked_role, DeviceRole::Multimedia);

        let config = unsafe { parse_config(ptr::null()) }.unwrap();
        assert!(config.log_level.is_none());
        assert_eq!(config.adapter, AdapterConfig::default());

        let broken = CString::new("{not json").unwrap();
        assert!(unsafe { parse_config(broken.as_ptr()) }.is_err());
    }

    #[test]
    fn test_device_list_json_shape() {
        let json = devices_json(vec![
            DeviceInfo::new("{0.0.1.00000000}.{a}", "Microphone (Yeti)"),
            DeviceInfo::new("{0.0.1.00000000}.{b}", ""),
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["devices"][0]["id"], "{0.0.1.00000000}.{a}");
        assert_eq!(value["devices"][0]["name"], "Microphone (Yeti)");
        assert_eq!(value["devices"][1]["name"], "");
    }

    extern "C" fn count(user_data: *mut c_void) {
        let counter = unsafe { &*(user_data as *const AtomicUsize) };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_callback_controller_forwards_to_c() {
        let counter = AtomicUsize::new(0);
        let controller = CallbackController {
            callbacks: AudioControllerCallbacks {
                user_data: &counter as *const AtomicUsize as *mut c_void,
                on_new_playback_device: Some(count),
                on_new_recording_device: Some(count),
                on_new_mirror_device: None,
                on_device_added: Some(count),
                on_device_removed: Some(count),
            },
        };

        controller.on_new_playback_device();
        controller.on_new_recording_device();
        controller.on_new_mirror_device();
        controller.on_device_added();
        controller.on_device_removed();

        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_interior_nul_becomes_empty_string() {
        assert_eq!(take_string(alloc_c_string("a\0b")), "");
    }
}
