//! Linux sysfs device registry.
//!
//! Reads the same data udev exposes, straight from sysfs:
//!
//! - `<sys>/class/<subsystem>/<name>` lists the entries of a subsystem
//! - `uevent` carries `DEVTYPE=` and `DEVNAME=` (node path relative to /dev)
//! - plain files in the entry directory are attributes (`removable`, `model`)
//! - `device` links to the parent device, whose `subsystem` link names its bus

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::enumerate::{DeviceRegistry, EnumerateError, RegistryDevice};

/// Default sysfs mount point.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Default device node directory.
pub const DEFAULT_DEV_ROOT: &str = "/dev";

/// [`DeviceRegistry`] backed by a sysfs tree.
#[derive(Debug, Clone)]
pub struct SysfsRegistry {
    sys_root: PathBuf,
    dev_root: PathBuf,
}

impl SysfsRegistry {
    /// Registry for the host's `/sys` and `/dev`.
    pub fn system() -> Result<Self, EnumerateError> {
        Self::new(DEFAULT_SYSFS_ROOT, DEFAULT_DEV_ROOT)
    }

    /// Registry rooted at `sys_root`, resolving node names under `dev_root`.
    ///
    /// Fails with [`EnumerateError::RegistryUnavailable`] when
    /// `<sys_root>/class` is not a readable directory.
    pub fn new(sys_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Result<Self, EnumerateError> {
        let sys_root = sys_root.into();
        let class_dir = sys_root.join("class");

        let unavailable = |error| EnumerateError::RegistryUnavailable {
            root: sys_root.clone(),
            error,
        };
        let metadata = fs::metadata(&class_dir).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(io::Error::from(io::ErrorKind::NotADirectory)));
        }

        Ok(Self {
            sys_root,
            dev_root: dev_root.into(),
        })
    }
}

impl DeviceRegistry for SysfsRegistry {
    type Device = SysfsDevice;

    fn scan_subsystem(&self, subsystem: &str) -> Result<Vec<SysfsDevice>, EnumerateError> {
        let scan_error = |error| EnumerateError::Scan {
            subsystem: subsystem.to_string(),
            error,
        };

        let dir = self.sys_root.join("class").join(subsystem);
        let mut devices = Vec::new();
        for entry in fs::read_dir(&dir).map_err(scan_error)? {
            let entry = entry.map_err(scan_error)?;
            devices.push(SysfsDevice::load(entry.path(), self.dev_root.clone()));
        }

        devices.sort_by(|a, b| a.syspath.cmp(&b.syspath));
        Ok(devices)
    }
}

/// One sysfs device directory.
///
/// `uevent` is read once, when the device is scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsDevice {
    syspath: PathBuf,
    dev_root: PathBuf,
    devtype: Option<String>,
    devname: Option<String>,
}

impl SysfsDevice {
    fn load(syspath: PathBuf, dev_root: PathBuf) -> Self {
        let mut uevent = read_uevent(&syspath);
        Self {
            devtype: uevent.remove("DEVTYPE"),
            devname: uevent.remove("DEVNAME").filter(|name| !name.is_empty()),
            syspath,
            dev_root,
        }
    }
}

/// `KEY=value` lines of `<syspath>/uevent`; empty when unreadable.
fn read_uevent(syspath: &Path) -> HashMap<String, String> {
    let Ok(contents) = fs::read_to_string(syspath.join("uevent")) else {
        return HashMap::new();
    };
    contents
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl RegistryDevice for SysfsDevice {
    fn syspath(&self) -> &Path {
        &self.syspath
    }

    fn devtype(&self) -> Option<String> {
        self.devtype.clone()
    }

    fn sysattr(&self, name: &str) -> Option<String> {
        let path = self.syspath.join(name);
        if !path.is_file() {
            return None;
        }
        fs::read_to_string(path)
            .ok()
            .map(|value| value.trim_end().to_string())
    }

    fn devnode(&self) -> Option<PathBuf> {
        self.devname.as_ref().map(|name| self.dev_root.join(name))
    }

    fn subsystem(&self) -> Option<String> {
        let target = fs::read_link(self.syspath.join("subsystem")).ok()?;
        target.file_name().map(|name| name.to_string_lossy().into_owned())
    }

    fn parent(&self) -> Option<Self> {
        let parent = self.syspath.join("device");
        parent.is_dir().then(|| Self::load(parent, self.dev_root.clone()))
    }
}
