//! Adapter configuration.

use super::device::DeviceRole;
use serde::{Deserialize, Serialize};

/// Which OS roles the adapter reads, follows and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Role used to resolve the playback and recording defaults at init.
    pub initial_role: DeviceRole,

    /// Role whose default-device notifications update the cached devices.
    pub tracked_role: DeviceRole,

    /// Roles made default when a playback or recording device is selected.
    pub default_roles: Vec<DeviceRole>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            initial_role: DeviceRole::Communications,
            tracked_role: DeviceRole::Multimedia,
            default_roles: vec![DeviceRole::Console],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AdapterConfig =
            serde_json::from_str(r#"{"default_roles":["console","communications"]}"#).unwrap();
        assert_eq!(config.initial_role, DeviceRole::Communications);
        assert_eq!(config.tracked_role, DeviceRole::Multimedia);
        assert_eq!(
            config.default_roles,
            vec![DeviceRole::Console, DeviceRole::Communications]
        );
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: AdapterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AdapterConfig::default());
    }
}
