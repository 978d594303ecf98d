//! Accessibility checks.
//!
//! A probe opens a device node in one direction with `O_NONBLOCK`, closes it
//! again and reports whether the open succeeded. No data is transferred, so
//! probing for write access is safe on a mounted disk.

use std::fmt;

use serde::Serialize;

use crate::device::{AccessMode, DeviceOpener, DeviceRef, OpenFlags, SystemOpener};
use crate::error::describe_io_error;

/// Outcome of one accessibility probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AccessProbeResult {
    /// The device node opened in the requested direction.
    Accessible,
    /// The open failed; carries the platform's error description.
    Denied(String),
}

impl AccessProbeResult {
    /// Whether the device opened.
    pub fn is_accessible(&self) -> bool {
        matches!(self, Self::Accessible)
    }

    /// The denial reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Accessible => None,
            Self::Denied(reason) => Some(reason),
        }
    }
}

impl fmt::Display for AccessProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accessible => f.write_str("OK"),
            Self::Denied(reason) => f.write_str(reason),
        }
    }
}

/// Probe `device` for `mode` access on the host.
pub fn probe(device: &DeviceRef, mode: AccessMode) -> AccessProbeResult {
    probe_with(&SystemOpener, device, mode)
}

/// Probe `device` for `mode` access through `opener`.
///
/// Failures are returned as [`AccessProbeResult::Denied`], never as errors.
pub fn probe_with<O: DeviceOpener>(
    opener: &O,
    device: &DeviceRef,
    mode: AccessMode,
) -> AccessProbeResult {
    match opener.open(device, OpenFlags::probe(mode)) {
        Ok(handle) => {
            drop(handle);
            tracing::debug!(device = %device, %mode, "probe succeeded");
            AccessProbeResult::Accessible
        }
        Err(e) => {
            let reason = describe_io_error(&e);
            tracing::debug!(device = %device, %mode, %reason, "probe denied");
            AccessProbeResult::Denied(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeviceScript, IoEvent, ScriptedOpener};

    #[test]
    fn test_probe_accessible_opens_and_closes() {
        let opener = ScriptedOpener::new().with_device("/dev/sda", DeviceScript::default());
        let device = DeviceRef::new("/dev/sda");

        let result = probe_with(&opener, &device, AccessMode::Read);

        assert_eq!(result, AccessProbeResult::Accessible);
        assert_eq!(opener.open_count(), 1);
        assert_eq!(opener.close_count(), 1);
        // No data moves during a probe
        assert!(opener
            .events()
            .iter()
            .all(|e| matches!(e, IoEvent::Open { .. } | IoEvent::Close { .. })));
    }

    #[test]
    fn test_probe_uses_nonblocking_cached_open() {
        let opener = ScriptedOpener::new().with_device("/dev/sda", DeviceScript::default());
        probe_with(&opener, &DeviceRef::new("/dev/sda"), AccessMode::Write);

        let events = opener.events();
        let IoEvent::Open { flags, .. } = &events[0] else {
            panic!("expected open event, got {events:?}");
        };
        assert_eq!(*flags, OpenFlags::probe(AccessMode::Write));
    }

    #[test]
    fn test_probe_denied_carries_reason() {
        let opener = ScriptedOpener::new()
            .with_device("/dev/sdb", DeviceScript::default().open_fails(libc::EACCES));

        let result = probe_with(&opener, &DeviceRef::new("/dev/sdb"), AccessMode::Write);

        assert_eq!(result, AccessProbeResult::Denied("Permission denied".to_string()));
        assert_eq!(opener.close_count(), 0);
    }

    #[test]
    fn test_probe_both_directions_independent() {
        let opener = ScriptedOpener::new().with_device("/dev/sda", DeviceScript::default());
        let device = DeviceRef::new("/dev/sda");

        let read = probe_with(&opener, &device, AccessMode::Read);
        let write = probe_with(&opener, &device, AccessMode::Write);

        assert!(read.is_accessible());
        assert!(write.is_accessible());
        assert_eq!(opener.open_count(), 2);
        assert_eq!(opener.close_count(), 2);
    }

    #[test]
    fn test_probe_missing_node_on_host() {
        let result = probe(&DeviceRef::new("/nonexistent/blkspeed/sdz"), AccessMode::Read);
        let reason = result.reason().expect("missing node must be denied");
        assert!(!reason.is_empty());
        assert_eq!(result.to_string(), reason);
    }

    #[test]
    fn test_display_ok() {
        assert_eq!(AccessProbeResult::Accessible.to_string(), "OK");
    }
}
