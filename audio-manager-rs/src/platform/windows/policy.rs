//! IPolicyConfig COM interfaces (undocumented but stable).
//! Used to set the default audio endpoint.

use super::com::to_wide;
use crate::audio::backend::DefaultEndpointPolicy;
use crate::audio::device::{AudioError, DeviceRole};
use crate::audio::policy::{first_available, Probe};
use windows::core::*;
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};

// Every known revision shares the vtable layout up to SetDefaultEndpoint
macro_rules! policy_config_interface {
    ($name:ident, $iid:literal) => {
        #[windows::core::interface($iid)]
        pub unsafe trait $name: IUnknown {
            // Reserved methods to maintain vtable order
            fn reserved1(&self) -> HRESULT;
            fn reserved2(&self) -> HRESULT;
            fn reserved3(&self) -> HRESULT;
            fn reserved4(&self) -> HRESULT;
            fn reserved5(&self) -> HRESULT;
            fn reserved6(&self) -> HRESULT;
            fn reserved7(&self) -> HRESULT;
            fn reserved8(&self) -> HRESULT;
            fn reserved9(&self) -> HRESULT;
            fn reserved10(&self) -> HRESULT;

            fn SetDefaultEndpoint(&self, device_id: PCWSTR, role: u32) -> HRESULT;
        }
    };
}

// Windows 10 and later
policy_config_interface!(IPolicyConfig10_1, "CA286FC3-91FD-42C3-8E9B-CAAFA66242E3");
policy_config_interface!(IPolicyConfig10, "6BE54BE8-A068-4875-A49D-0C2966473B11");
// Windows Vista, 7, 8, 8.1
policy_config_interface!(IPolicyConfig7, "F8679F50-850A-41CF-9C72-430F290290C8");

// PolicyConfigClient CLSID
const CLSID_POLICY_CONFIG_CLIENT: GUID = GUID::from_u128(0x870af99c_171d_4f9e_af0d_e63df40c2bc9);

/// Newest interface first.
const PROBES: [Probe<PolicyConfig>; 3] = [
    Probe {
        name: "IPolicyConfig10_1",
        attempt: create_10_1,
    },
    Probe {
        name: "IPolicyConfig10",
        attempt: create_10,
    },
    Probe {
        name: "IPolicyConfig7",
        attempt: create_7,
    },
];

fn create<T: Interface>() -> std::result::Result<T, AudioError> {
    unsafe { Ok(CoCreateInstance(&CLSID_POLICY_CONFIG_CLIENT, None, CLSCTX_INPROC_SERVER)?) }
}

fn create_10_1() -> std::result::Result<PolicyConfig, AudioError> {
    create().map(PolicyConfig::Win10_1)
}

fn create_10() -> std::result::Result<PolicyConfig, AudioError> {
    create().map(PolicyConfig::Win10)
}

fn create_7() -> std::result::Result<PolicyConfig, AudioError> {
    create().map(PolicyConfig::Win7)
}

/// Whichever policy-config revision the running OS provides.
pub enum PolicyConfig {
    Win10_1(IPolicyConfig10_1),
    Win10(IPolicyConfig10),
    Win7(IPolicyConfig7),
}

// SAFETY: the policy config client is registered as free-threaded ("Both")
// and is only used for SetDefaultEndpoint.
unsafe impl Send for PolicyConfig {}
unsafe impl Sync for PolicyConfig {}

impl PolicyConfig {
    /// Create the newest available revision.
    pub fn probe() -> std::result::Result<Self, AudioError> {
        first_available(&PROBES)
    }
}

impl DefaultEndpointPolicy for PolicyConfig {
    fn set_default_endpoint(
        &self,
        device_id: &str,
        role: DeviceRole,
    ) -> std::result::Result<(), AudioError> {
        let device_id_wide = to_wide(device_id);
        let device_id = PCWSTR(device_id_wide.as_ptr());
        let role = role as u32;
        let hr = unsafe {
            match self {
                PolicyConfig::Win10_1(config) => config.SetDefaultEndpoint(device_id, role),
                PolicyConfig::Win10(config) => config.SetDefaultEndpoint(device_id, role),
                PolicyConfig::Win7(config) => config.SetDefaultEndpoint(device_id, role),
            }
        };
        hr.ok()?;
        Ok(())
    }
}
