//! COM initialization and wide-string helpers.

use crate::audio::device::AudioError;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{
    CoInitializeEx, CoTaskMemFree, CoUninitialize, COINIT_APARTMENTTHREADED,
    COINIT_MULTITHREADED,
};

/// Threading model requested from COM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComApartment {
    /// Apartment-threaded, for threads that own windows (UI threads)
    SingleThreaded,

    /// Free-threaded
    MultiThreaded,
}

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    ///
    /// If the thread already joined an apartment with a different model the
    /// existing apartment is used and nothing is uninitialized on drop.
    pub fn new(apartment: ComApartment) -> Result<Self, AudioError> {
        let model = match apartment {
            ComApartment::SingleThreaded => COINIT_APARTMENTTHREADED,
            ComApartment::MultiThreaded => COINIT_MULTITHREADED,
        };
        let hr = unsafe { CoInitializeEx(None, model) };
        if hr == RPC_E_CHANGED_MODE {
            return Ok(Self { initialized: false });
        }
        hr.ok().map_err(|e| AudioError::ComInitFailed {
            code: e.code().0,
            message: e.message(),
        })?;
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Null-terminated UTF-16 copy of a string.
pub(super) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Convert a COM-allocated string and free it.
///
/// # Safety
/// `value` must be null or a string allocated with `CoTaskMemAlloc` that the
/// caller owns.
pub(super) unsafe fn take_co_string(value: PWSTR) -> Result<String, AudioError> {
    if value.is_null() {
        return Err(AudioError::StringConversion("null string".to_string()));
    }
    let converted = value
        .to_string()
        .map_err(|e| AudioError::StringConversion(e.to_string()));
    CoTaskMemFree(Some(value.0 as *const _));
    converted
}

/// Convert a borrowed OS string, if present.
///
/// # Safety
/// `value` must be null or point to a valid null-terminated UTF-16 string.
pub(super) unsafe fn borrowed_string(value: &PCWSTR) -> Option<String> {
    if value.is_null() {
        None
    } else {
        value.to_string().ok()
    }
}
