//! Scripted device doubles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::device::{DeviceOpener, DeviceRef, OpenFlags, RawDevice};

/// Bytes of each write kept for inspection.
const WRITE_CAPTURE_LIMIT: usize = 4096;

/// Scripted outcome of one read or write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Move the whole buffer.
    Full,
    /// Move at most this many bytes.
    Short(usize),
    /// Fail with this raw OS error code.
    Fail(i32),
}

/// Behaviour of one scripted device.
#[derive(Debug, Clone)]
pub struct DeviceScript {
    open_errno: Option<i32>,
    read: Transfer,
    write: Transfer,
    sync_errno: Option<i32>,
    fill: u8,
    latency: Duration,
}

impl Default for DeviceScript {
    fn default() -> Self {
        Self {
            open_errno: None,
            read: Transfer::Full,
            write: Transfer::Full,
            sync_errno: None,
            fill: 0xA5,
            latency: Duration::from_millis(1),
        }
    }
}

impl DeviceScript {
    /// Fail every open with `errno`.
    #[must_use]
    pub fn open_fails(mut self, errno: i32) -> Self {
        self.open_errno = Some(errno);
        self
    }

    /// Outcome of read calls.
    #[must_use]
    pub fn read(mut self, transfer: Transfer) -> Self {
        self.read = transfer;
        self
    }

    /// Outcome of write calls.
    #[must_use]
    pub fn write(mut self, transfer: Transfer) -> Self {
        self.write = transfer;
        self
    }

    /// Fail every flush with `errno`.
    #[must_use]
    pub fn sync_fails(mut self, errno: i32) -> Self {
        self.sync_errno = Some(errno);
        self
    }

    /// Byte value reads place in the buffer.
    #[must_use]
    pub fn fill(mut self, byte: u8) -> Self {
        self.fill = byte;
        self
    }

    /// Time each transfer and flush takes.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// A call observed by a [`ScriptedOpener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoEvent {
    /// A handle was opened.
    Open {
        /// Device path.
        device: PathBuf,
        /// Flags passed to the open.
        flags: OpenFlags,
    },
    /// A read was issued.
    Read {
        /// Buffer length.
        requested: usize,
        /// Bytes returned (0 on failure).
        returned: usize,
    },
    /// A write was issued.
    Write {
        /// Buffer length.
        requested: usize,
        /// Bytes accepted (0 on failure).
        returned: usize,
    },
    /// A flush was issued.
    Sync,
    /// A handle was dropped.
    Close {
        /// Device path.
        device: PathBuf,
    },
}

impl IoEvent {
    /// Short lowercase name of the call.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Sync => "sync",
            Self::Close { .. } => "close",
        }
    }
}

#[derive(Debug, Default)]
struct Journal {
    events: Vec<IoEvent>,
    written: HashMap<PathBuf, Vec<u8>>,
}

/// [`DeviceOpener`] that replays scripts instead of touching the host.
///
/// Clones share one journal, so a clone handed to a benchmarker can be
/// inspected through the original. Paths without a script fail to open with
/// `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOpener {
    scripts: HashMap<PathBuf, DeviceScript>,
    journal: Rc<RefCell<Journal>>,
}

impl ScriptedOpener {
    /// An opener with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `script` for the device at `path`.
    #[must_use]
    pub fn with_device(mut self, path: impl Into<PathBuf>, script: DeviceScript) -> Self {
        self.scripts.insert(path.into(), script);
        self
    }

    /// Every call observed so far, in order.
    pub fn events(&self) -> Vec<IoEvent> {
        self.journal.borrow().events.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.count(|e| matches!(e, IoEvent::Open { .. }))
    }

    /// Number of handles dropped.
    pub fn close_count(&self) -> usize {
        self.count(|e| matches!(e, IoEvent::Close { .. }))
    }

    /// First `len` bytes of the last write to `path`.
    pub fn written_prefix(&self, path: impl AsRef<Path>, len: usize) -> Option<Vec<u8>> {
        let journal = self.journal.borrow();
        let data = journal.written.get(path.as_ref())?;
        Some(data[..len.min(data.len())].to_vec())
    }

    fn count(&self, pred: impl Fn(&IoEvent) -> bool) -> usize {
        self.journal.borrow().events.iter().filter(|e| pred(e)).count()
    }
}

impl DeviceOpener for ScriptedOpener {
    type Device = ScriptedDevice;

    fn open(&self, device: &DeviceRef, flags: OpenFlags) -> io::Result<ScriptedDevice> {
        let Some(script) = self.scripts.get(device.path()) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"));
        };
        if let Some(errno) = script.open_errno {
            return Err(io::Error::from_raw_os_error(errno));
        }

        self.journal.borrow_mut().events.push(IoEvent::Open {
            device: device.path().to_path_buf(),
            flags,
        });
        Ok(ScriptedDevice {
            device: device.path().to_path_buf(),
            script: script.clone(),
            journal: Rc::clone(&self.journal),
        })
    }
}

/// Handle returned by [`ScriptedOpener`].
#[derive(Debug)]
pub struct ScriptedDevice {
    device: PathBuf,
    script: DeviceScript,
    journal: Rc<RefCell<Journal>>,
}

impl ScriptedDevice {
    fn resolve(transfer: Transfer, len: usize) -> io::Result<usize> {
        match transfer {
            Transfer::Full => Ok(len),
            Transfer::Short(n) => Ok(n.min(len)),
            Transfer::Fail(errno) => Err(io::Error::from_raw_os_error(errno)),
        }
    }
}

impl RawDevice for ScriptedDevice {
    fn read_once(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        std::thread::sleep(self.script.latency);
        let outcome = Self::resolve(self.script.read, buf.len());
        if let Ok(n) = outcome {
            buf[..n].fill(self.script.fill);
        }
        self.journal.borrow_mut().events.push(IoEvent::Read {
            requested: buf.len(),
            returned: *outcome.as_ref().unwrap_or(&0),
        });
        outcome
    }

    fn write_once(&mut self, buf: &[u8]) -> io::Result<usize> {
        std::thread::sleep(self.script.latency);
        let outcome = Self::resolve(self.script.write, buf.len());
        let mut journal = self.journal.borrow_mut();
        if let Ok(n) = outcome {
            let captured = buf[..n.min(WRITE_CAPTURE_LIMIT)].to_vec();
            journal.written.insert(self.device.clone(), captured);
        }
        journal.events.push(IoEvent::Write {
            requested: buf.len(),
            returned: *outcome.as_ref().unwrap_or(&0),
        });
        outcome
    }

    fn sync(&mut self) -> io::Result<()> {
        std::thread::sleep(self.script.latency);
        self.journal.borrow_mut().events.push(IoEvent::Sync);
        match self.script.sync_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        self.journal.borrow_mut().events.push(IoEvent::Close {
            device: self.device.clone(),
        });
    }
}
