//! Block device discovery, access probing and raw throughput benchmarks.
//!
//! This crate finds fixed disks on a host, checks whether they can be opened
//! for reading and writing without moving any data, and measures raw
//! sequential throughput with a single large unbuffered transfer.
//!
//! # Components
//!
//! - [`probe`] - open/close a device node in one direction and report
//!   [`AccessProbeResult`]
//! - [`bench`] - read and write throughput benchmarks ([`measure_read`],
//!   [`measure_write`]) built on an aligned, scoped [`AlignedBuffer`]
//! - [`enumerate`] - scan the host device registry for non-removable disks
//!   and probe each one ([`list_devices`])
//! - [`device`] - the raw I/O seam ([`DeviceOpener`], [`RawDevice`]) shared
//!   by all of the above
//!
//! # Example
//!
//! ```no_run
//! use blkspeed_core::{measure_read, DeviceRef, TransferSize};
//!
//! let device = DeviceRef::new("/dev/sda");
//! let result = measure_read(&device, TransferSize::from_mib(0))?;
//! println!("{:.2} MB/s", result.throughput_mbps);
//! # Ok::<(), blkspeed_core::IoFault>(())
//! ```
//!
//! # Destructive writes
//!
//! [`measure_write`] overwrites the first bytes of the target device. It is a
//! separate entry point and is never called from enumeration or probing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bench;
pub mod buffer;
pub mod device;
pub mod enumerate;
pub mod error;
pub mod probe;

/// Test doubles for the raw I/O and device registry seams.
///
/// Shared by the unit tests in this crate and the integration tests of
/// downstream crates.
pub mod testing;

pub use bench::{
    measure_read, measure_read_retaining, measure_write, BenchConfig, BenchmarkResult,
    Benchmarker, ReadMeasurement, TransferOp, TransferSize, DEFAULT_SIZE_MIB, MIB,
};
pub use buffer::{AlignedBuffer, ALIGNMENT, MAX_LEN};
pub use device::{AccessMode, DeviceOpener, DeviceRef, OpenFlags, RawDevice, SystemDevice, SystemOpener};
pub use enumerate::{
    list_devices, list_devices_with, AccessReport, DeviceRecord, DeviceRegistry, RegistryDevice,
    SysfsDevice, SysfsRegistry,
};
pub use error::{describe_io_error, EnumerateError, IoFault};
pub use probe::{probe, probe_with, AccessProbeResult};
