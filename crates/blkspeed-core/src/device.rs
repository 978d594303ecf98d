//! Raw device access.
//!
//! [`DeviceOpener`] and [`RawDevice`] are the seam between the benchmarks and
//! the operating system. [`SystemOpener`] opens real device nodes with the
//! requested flags; [`crate::testing::ScriptedOpener`] replays scripted
//! outcomes so fault paths can be exercised without hardware.
//!
//! A device handle is released when it is dropped, so every early return
//! (including `?` on a fault) closes it.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Path naming a block device node, e.g. `/dev/sda`.
///
/// This is a handle into host state; nothing here checks that the node
/// exists or is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceRef(PathBuf);

impl DeviceRef {
    /// Create a reference to the device node at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The device node path.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for DeviceRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for DeviceRef {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for DeviceRef {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Direction a device is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Read-only (`O_RDONLY`).
    Read,
    /// Write-only (`O_WRONLY`).
    Write,
}

impl AccessMode {
    /// Lowercase name for logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flags used to open a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Direction of the open.
    pub mode: AccessMode,
    /// Bypass the host page cache (`O_DIRECT` / `F_NOCACHE`).
    pub direct: bool,
    /// Fail fast instead of waiting for a device that is not ready.
    pub nonblocking: bool,
}

impl OpenFlags {
    /// Flags for an accessibility probe: non-blocking, cached, no transfer.
    pub const fn probe(mode: AccessMode) -> Self {
        Self {
            mode,
            direct: false,
            nonblocking: true,
        }
    }

    /// Flags for a throughput benchmark.
    ///
    /// Some device classes stall on open, so benchmarks always open
    /// non-blocking; `direct` is normally on.
    pub const fn benchmark(mode: AccessMode, direct: bool) -> Self {
        Self {
            mode,
            direct,
            nonblocking: true,
        }
    }
}

/// An open device handle.
///
/// Each method issues exactly one request and never retries. Short counts are
/// returned as-is.
pub trait RawDevice {
    /// Issue one read into `buf`, returning the bytes read.
    fn read_once(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Issue one write of `buf`, returning the bytes written.
    fn write_once(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Force previously written bytes to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

/// Opens device nodes.
pub trait DeviceOpener {
    /// Handle type; closing happens on drop.
    type Device: RawDevice;

    /// Open `device` with `flags`.
    fn open(&self, device: &DeviceRef, flags: OpenFlags) -> io::Result<Self::Device>;
}

/// Opens real device nodes through the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

/// A device node opened by [`SystemOpener`].
#[derive(Debug)]
pub struct SystemDevice {
    file: File,
}

impl RawDevice for SystemDevice {
    fn read_once(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_once(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl DeviceOpener for SystemOpener {
    type Device = SystemDevice;

    fn open(&self, device: &DeviceRef, flags: OpenFlags) -> io::Result<SystemDevice> {
        let mut options = OpenOptions::new();
        match flags.mode {
            AccessMode::Read => {
                options.read(true);
            }
            AccessMode::Write => {
                options.write(true);
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(custom_flags(flags));
        }

        let file = options.open(device.path())?;

        #[cfg(target_os = "macos")]
        if flags.direct {
            disable_page_cache(&file)?;
        }

        tracing::trace!(device = %device, ?flags, "opened device node");
        Ok(SystemDevice { file })
    }
}

#[cfg(unix)]
fn custom_flags(flags: OpenFlags) -> i32 {
    let mut custom = 0;
    if flags.nonblocking {
        custom |= libc::O_NONBLOCK;
    }
    #[cfg(any(target_os = "linux", target_os = "android"))]
    if flags.direct {
        custom |= libc::O_DIRECT;
    }
    custom
}

/// macOS has no `O_DIRECT`; `F_NOCACHE` on the open descriptor is the
/// equivalent.
#[cfg(target_os = "macos")]
#[allow(unsafe_code)]
fn disable_page_cache(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file`, which outlives this call.
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_device_ref_display() {
        let device = DeviceRef::new("/dev/sda");
        assert_eq!(device.to_string(), "/dev/sda");
        assert_eq!(device, DeviceRef::from("/dev/sda"));
    }

    #[test]
    fn test_probe_flags_are_nonblocking_and_cached() {
        let flags = OpenFlags::probe(AccessMode::Write);
        assert!(flags.nonblocking);
        assert!(!flags.direct);
        assert_eq!(flags.mode, AccessMode::Write);
    }

    #[cfg(unix)]
    #[test]
    fn test_custom_flags_include_nonblock() {
        let custom = custom_flags(OpenFlags::benchmark(AccessMode::Read, false));
        assert_eq!(custom & libc::O_NONBLOCK, libc::O_NONBLOCK);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_custom_flags_direct_on_linux() {
        let custom = custom_flags(OpenFlags::benchmark(AccessMode::Read, true));
        assert_eq!(custom & libc::O_DIRECT, libc::O_DIRECT);
        let cached = custom_flags(OpenFlags::benchmark(AccessMode::Read, false));
        assert_eq!(cached & libc::O_DIRECT, 0);
    }

    #[test]
    fn test_system_opener_reads_regular_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"blkspeed").unwrap();

        let device = DeviceRef::new(file.path());
        let mut handle = SystemOpener
            .open(&device, OpenFlags::benchmark(AccessMode::Read, false))
            .unwrap();
        let mut buf = [0u8; 16];
        let n = handle.read_once(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"blkspeed");
    }

    #[test]
    fn test_system_opener_missing_node() {
        let device = DeviceRef::new("/nonexistent/blkspeed/device");
        let err = SystemOpener
            .open(&device, OpenFlags::probe(AccessMode::Read))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
