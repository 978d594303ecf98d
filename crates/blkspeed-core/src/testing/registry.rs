//! In-memory device registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::enumerate::{DeviceRegistry, EnumerateError, RegistryDevice, BLOCK_SUBSYSTEM};

/// A hand-built registry entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDevice {
    syspath: PathBuf,
    devtype: Option<String>,
    subsystem: Option<String>,
    devnode: Option<PathBuf>,
    attributes: BTreeMap<String, String>,
    parent: Option<Box<StaticDevice>>,
}

impl StaticDevice {
    /// An entry with nothing but a registry path.
    pub fn new(syspath: impl Into<PathBuf>) -> Self {
        Self {
            syspath: syspath.into(),
            ..Self::default()
        }
    }

    /// A non-removable whole disk at `/dev/<name>` under a SCSI parent.
    pub fn fixed_disk(name: &str, model: Option<&str>) -> Self {
        Self::disk(name, "0", model)
    }

    /// A removable whole disk at `/dev/<name>` under a SCSI parent.
    pub fn removable_disk(name: &str, model: Option<&str>) -> Self {
        Self::disk(name, "1", model)
    }

    /// A partition at `/dev/<name>`.
    pub fn partition(name: &str) -> Self {
        Self::new(format!("/sys/class/block/{name}"))
            .with_devtype("partition")
            .with_attribute("removable", "0")
            .with_devnode(format!("/dev/{name}"))
    }

    fn disk(name: &str, removable: &str, model: Option<&str>) -> Self {
        let mut parent = Self::new(format!("/sys/devices/host0/{name}")).with_subsystem("scsi");
        if let Some(model) = model {
            parent = parent.with_attribute("model", model);
        }
        Self::new(format!("/sys/class/block/{name}"))
            .with_subsystem(BLOCK_SUBSYSTEM)
            .with_devtype("disk")
            .with_attribute("removable", removable)
            .with_devnode(format!("/dev/{name}"))
            .with_parent(parent)
    }

    /// Set the device type.
    #[must_use]
    pub fn with_devtype(mut self, devtype: &str) -> Self {
        self.devtype = Some(devtype.to_string());
        self
    }

    /// Set the subsystem.
    #[must_use]
    pub fn with_subsystem(mut self, subsystem: &str) -> Self {
        self.subsystem = Some(subsystem.to_string());
        self
    }

    /// Set the device node path.
    #[must_use]
    pub fn with_devnode(mut self, devnode: impl Into<PathBuf>) -> Self {
        self.devnode = Some(devnode.into());
        self
    }

    /// Remove the device node path.
    #[must_use]
    pub fn without_devnode(mut self) -> Self {
        self.devnode = None;
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the parent device.
    #[must_use]
    pub fn with_parent(mut self, parent: StaticDevice) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

impl RegistryDevice for StaticDevice {
    fn syspath(&self) -> &Path {
        &self.syspath
    }

    fn devtype(&self) -> Option<String> {
        self.devtype.clone()
    }

    fn sysattr(&self, name: &str) -> Option<String> {
        self.attributes.get(name).map(|v| v.trim_end().to_string())
    }

    fn devnode(&self) -> Option<PathBuf> {
        self.devnode.clone()
    }

    fn subsystem(&self) -> Option<String> {
        self.subsystem.clone()
    }

    fn parent(&self) -> Option<Self> {
        self.parent.as_deref().cloned()
    }
}

/// [`DeviceRegistry`] serving [`StaticDevice`] entries in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    subsystems: BTreeMap<String, Vec<StaticDevice>>,
}

impl StaticRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `device` to `subsystem`.
    #[must_use]
    pub fn with_device(mut self, subsystem: &str, device: StaticDevice) -> Self {
        self.subsystems
            .entry(subsystem.to_string())
            .or_default()
            .push(device);
        self
    }

    /// Add `device` to the block subsystem.
    #[must_use]
    pub fn with_block_device(self, device: StaticDevice) -> Self {
        self.with_device(BLOCK_SUBSYSTEM, device)
    }
}

impl DeviceRegistry for StaticRegistry {
    type Device = StaticDevice;

    fn scan_subsystem(&self, subsystem: &str) -> Result<Vec<StaticDevice>, EnumerateError> {
        Ok(self.subsystems.get(subsystem).cloned().unwrap_or_default())
    }
}
