//! On-disk sysfs/dev fixture.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::PathBuf;

use crate::enumerate::{EnumerateError, SysfsRegistry, BLOCK_SUBSYSTEM};

/// A block device to lay out in a [`FakeSysfs`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDisk {
    name: String,
    devtype: String,
    removable: Option<String>,
    model: Option<String>,
    bus: Option<String>,
}

impl FakeDisk {
    /// A non-removable whole disk on the SCSI bus.
    pub fn fixed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            devtype: "disk".to_string(),
            removable: Some("0".to_string()),
            model: None,
            bus: Some("scsi".to_string()),
        }
    }

    /// A removable whole disk on the SCSI bus.
    pub fn removable(name: &str) -> Self {
        Self {
            removable: Some("1".to_string()),
            ..Self::fixed(name)
        }
    }

    /// A partition entry.
    pub fn partition(name: &str) -> Self {
        Self {
            devtype: "partition".to_string(),
            ..Self::fixed(name)
        }
    }

    /// Model string on the parent device. Written with a trailing newline
    /// and padding like the kernel does.
    #[must_use]
    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Bus the parent device sits on.
    #[must_use]
    pub fn bus(mut self, bus: &str) -> Self {
        self.bus = Some(bus.to_string());
        self
    }

    /// Place the entry under `devices/virtual` with no parent device.
    #[must_use]
    pub fn without_parent(mut self) -> Self {
        self.bus = None;
        self
    }

    /// Omit the `removable` attribute.
    #[must_use]
    pub fn without_removable(mut self) -> Self {
        self.removable = None;
        self
    }
}

/// A sysfs and dev tree under a scratch directory.
///
/// ```text
/// <root>/sys/class/block/<name>          -> entry directory
/// <root>/sys/devices/<bus>-host/<name>/  parent (subsystem link, model)
///     block/<name>/                      entry (uevent, removable, device link)
/// <root>/sys/devices/virtual/block/<name>/
/// <root>/dev/<name>                      regular file standing in for the node
/// ```
#[derive(Debug, Clone)]
pub struct FakeSysfs {
    root: PathBuf,
}

impl FakeSysfs {
    /// Create an empty tree under `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let fake = Self { root: root.into() };
        fs::create_dir_all(fake.sys_root().join("class").join(BLOCK_SUBSYSTEM))?;
        fs::create_dir_all(fake.dev_root())?;
        Ok(fake)
    }

    /// Directory to pass as the sysfs root.
    pub fn sys_root(&self) -> PathBuf {
        self.root.join("sys")
    }

    /// Directory to pass as the device node root.
    pub fn dev_root(&self) -> PathBuf {
        self.root.join("dev")
    }

    /// A registry reading this tree.
    pub fn registry(&self) -> Result<SysfsRegistry, EnumerateError> {
        SysfsRegistry::new(self.sys_root(), self.dev_root())
    }

    /// Lay out `disk` and create its node file.
    pub fn add(&self, disk: &FakeDisk) -> io::Result<PathBuf> {
        let sys = self.sys_root();
        let name = &disk.name;

        let entry = match &disk.bus {
            Some(bus) => {
                let bus_dir = sys.join("bus").join(bus);
                fs::create_dir_all(&bus_dir)?;

                let parent = sys.join("devices").join(format!("{bus}-host")).join(name);
                fs::create_dir_all(&parent)?;
                symlink(&bus_dir, parent.join("subsystem"))?;
                if let Some(model) = &disk.model {
                    fs::write(parent.join("model"), format!("{model}  \n"))?;
                }

                let entry = parent.join(BLOCK_SUBSYSTEM).join(name);
                fs::create_dir_all(&entry)?;
                symlink(&parent, entry.join("device"))?;
                entry
            }
            None => {
                let entry = sys.join("devices").join("virtual").join(BLOCK_SUBSYSTEM).join(name);
                fs::create_dir_all(&entry)?;
                entry
            }
        };

        fs::write(
            entry.join("uevent"),
            format!("MAJOR=8\nMINOR=0\nDEVNAME={name}\nDEVTYPE={}\n", disk.devtype),
        )?;
        if let Some(removable) = &disk.removable {
            fs::write(entry.join("removable"), format!("{removable}\n"))?;
        }
        symlink(&entry, sys.join("class").join(BLOCK_SUBSYSTEM).join(name))?;

        let node = self.dev_root().join(name);
        fs::write(&node, vec![0u8; 4096])?;
        Ok(node)
    }
}
