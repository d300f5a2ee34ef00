//! Capability probing for the default-endpoint policy service.
//!
//! The policy interface exists in several OS-version-specific flavours. They
//! are tried in order of preference and the first one that can be created
//! wins.

use super::device::AudioError;
use tracing::debug;

/// One named attempt at acquiring a capability.
pub struct Probe<T> {
    pub name: &'static str,
    pub attempt: fn() -> Result<T, AudioError>,
}

/// Run probes in order and return the first success.
///
/// Returns the last probe's error (or `PolicyConfigUnavailable` when the list
/// is empty) if every probe fails.
pub fn first_available<T>(probes: &[Probe<T>]) -> Result<T, AudioError> {
    let mut last_error = AudioError::PolicyConfigUnavailable;
    for probe in probes {
        match (probe.attempt)() {
            Ok(found) => {
                debug!(interface = probe.name, "Policy config probe succeeded");
                return Ok(found);
            }
            Err(e) => {
                debug!(interface = probe.name, error = %e, "Policy config probe failed");
                last_error = e;
            }
        }
    }
    Err(last_error)
}
