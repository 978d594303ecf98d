//! Fixed-disk discovery.
//!
//! The enumerator asks a [`DeviceRegistry`] for everything in the `block`
//! subsystem, keeps whole non-removable disks that sit under a real parent
//! device, and probes each survivor for read and write access. The scan is a
//! single point-in-time snapshot.

mod sysfs;

pub use sysfs::{SysfsDevice, SysfsRegistry, DEFAULT_DEV_ROOT, DEFAULT_SYSFS_ROOT};

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::device::{AccessMode, DeviceOpener, DeviceRef, SystemOpener};
use crate::error::describe_io_error;
use crate::probe::{probe_with, AccessProbeResult};

/// Registry subsystem holding block devices.
pub const BLOCK_SUBSYSTEM: &str = "block";

/// Device type of whole disks (as opposed to partitions).
pub const DISK_DEVTYPE: &str = "disk";

/// Value of the `removable` attribute on fixed disks.
pub const FIXED_REMOVABLE: &str = "0";

/// An entry in the host device registry.
pub trait RegistryDevice: Sized {
    /// Registry path of the entry.
    fn syspath(&self) -> &Path;

    /// Device type, e.g. `disk` or `partition`.
    fn devtype(&self) -> Option<String>;

    /// Attribute value with trailing whitespace removed.
    fn sysattr(&self, name: &str) -> Option<String>;

    /// Device node path, e.g. `/dev/sda`.
    fn devnode(&self) -> Option<PathBuf>;

    /// Subsystem the entry belongs to.
    fn subsystem(&self) -> Option<String>;

    /// The parent device, if the entry has one.
    fn parent(&self) -> Option<Self>;
}

/// The host device registry.
pub trait DeviceRegistry {
    /// Entry type.
    type Device: RegistryDevice;

    /// All entries in `subsystem`, in a stable order.
    fn scan_subsystem(&self, subsystem: &str) -> Result<Vec<Self::Device>, EnumerateError>;
}

/// Errors that end an enumeration pass.
#[derive(Error, Debug)]
pub enum EnumerateError {
    /// The registry could not be opened.
    #[error("device registry unavailable at {}: {}", .root.display(), describe_io_error(.error))]
    RegistryUnavailable {
        /// Registry root that was tried.
        root: PathBuf,
        /// Underlying error.
        error: io::Error,
    },

    /// A subsystem listing could not be read.
    #[error("cannot scan subsystem {subsystem}: {}", describe_io_error(.error))]
    Scan {
        /// Subsystem being scanned.
        subsystem: String,
        /// Underlying error.
        error: io::Error,
    },
}

/// Read and write probe outcomes for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessReport {
    /// Read-only open.
    pub read: AccessProbeResult,
    /// Write-only open.
    pub write: AccessProbeResult,
}

impl AccessReport {
    /// Probe `device` in both directions.
    pub fn probe<O: DeviceOpener>(opener: &O, device: &DeviceRef) -> Self {
        Self {
            read: probe_with(opener, device, AccessMode::Read),
            write: probe_with(opener, device, AccessMode::Write),
        }
    }
}

/// A fixed disk found by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    /// Device node path.
    pub node_path: DeviceRef,
    /// Model string reported by the parent device.
    pub model: Option<String>,
    /// Accessibility of the node.
    pub access: AccessReport,
}

/// List fixed disks on the host and probe each one.
pub fn list_devices() -> Result<Vec<DeviceRecord>, EnumerateError> {
    let registry = SysfsRegistry::system()?;
    list_devices_with(&registry, &SystemOpener)
}

/// List fixed disks in `registry`, probing through `opener`.
///
/// Probing never writes data; the write probe only opens and closes the node.
#[instrument(level = "info", name = "enumerate::list_devices", skip_all)]
pub fn list_devices_with<R, O>(registry: &R, opener: &O) -> Result<Vec<DeviceRecord>, EnumerateError>
where
    R: DeviceRegistry,
    O: DeviceOpener,
{
    let entries = registry.scan_subsystem(BLOCK_SUBSYSTEM)?;
    tracing::debug!("registry returned {} block entries", entries.len());

    let records: Vec<DeviceRecord> = entries
        .iter()
        .filter_map(fixed_disk)
        .map(|(node_path, model)| {
            let access = AccessReport::probe(opener, &node_path);
            DeviceRecord {
                node_path,
                model,
                access,
            }
        })
        .collect();

    tracing::info!("found {} fixed disks", records.len());
    Ok(records)
}

/// Node path and model of `entry` if it is a fixed whole disk under a real
/// parent device.
fn fixed_disk<D: RegistryDevice>(entry: &D) -> Option<(DeviceRef, Option<String>)> {
    let syspath = entry.syspath();

    if entry.devtype().as_deref() != Some(DISK_DEVTYPE) {
        tracing::trace!(syspath = %syspath.display(), "skipping: not a disk");
        return None;
    }
    if entry.sysattr("removable").as_deref() != Some(FIXED_REMOVABLE) {
        tracing::trace!(syspath = %syspath.display(), "skipping: removable");
        return None;
    }
    let Some(devnode) = entry.devnode() else {
        tracing::debug!(syspath = %syspath.display(), "skipping: no device node");
        return None;
    };
    let Some(parent) = entry.parent() else {
        tracing::debug!(syspath = %syspath.display(), "skipping: no parent device");
        return None;
    };
    if parent.subsystem().is_none() {
        tracing::debug!(syspath = %syspath.display(), "skipping: parent has no subsystem");
        return None;
    }

    let model = parent
        .sysattr("model")
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    Some((DeviceRef::new(devnode), model))
}
