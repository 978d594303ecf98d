//! Testing utilities for benchmarks and enumeration.
//!
//! This module provides test doubles for the two seams of the crate:
//!
//! - **Devices**: [`ScriptedOpener`] replays a [`DeviceScript`] per device
//!   path (open failures, short or failed transfers, flush failures) and
//!   records every call as an [`IoEvent`]
//! - **Registry**: [`StaticRegistry`] serves hand-built [`StaticDevice`]
//!   entries
//! - **Sysfs**: [`FakeSysfs`] lays out a sysfs/dev tree on disk for
//!   [`crate::SysfsRegistry`] and for end-to-end CLI tests
//!
//! # Usage
//!
//! ```
//! use blkspeed_core::testing::{DeviceScript, ScriptedOpener, Transfer};
//! use blkspeed_core::{BenchConfig, Benchmarker, DeviceRef, TransferSize};
//!
//! let opener = ScriptedOpener::new()
//!     .with_device("/dev/sda", DeviceScript::default().read(Transfer::Short(4096)));
//! let bench = Benchmarker::new(opener.clone(), BenchConfig::with_size(TransferSize::from_mib(1)));
//!
//! let result = bench.read(&DeviceRef::new("/dev/sda")).unwrap();
//! assert_eq!(result.bytes_transferred, 4096);
//! assert_eq!(opener.open_count(), opener.close_count());
//! ```

mod devices;
mod registry;
#[cfg(unix)]
mod sysfs;

pub use devices::{DeviceScript, IoEvent, ScriptedDevice, ScriptedOpener, Transfer};
pub use registry::{StaticDevice, StaticRegistry};
#[cfg(unix)]
pub use sysfs::{FakeDisk, FakeSysfs};
