//! Raw throughput benchmarks.
//!
//! Each benchmark opens the device for unbuffered access, performs exactly
//! one transfer of the full requested size and times it with a monotonic
//! clock. Writes are followed by a durability flush inside the timed region.
//!
//! The read benchmark can hand its buffer to the write benchmark
//! ([`measure_read_retaining`] then [`measure_write`]); ownership moves with
//! the buffer and whichever benchmark runs last frees it.

mod read;
mod write;

pub use read::{measure_read, measure_read_retaining, ReadMeasurement};
pub use write::measure_write;

use std::fmt;
use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::device::{AccessMode, DeviceOpener, DeviceRef, SystemOpener};
use crate::error::describe_io_error;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Transfer size used when the caller asks for 0 MiB.
pub const DEFAULT_SIZE_MIB: u32 = 100;

/// Resolved size of a single benchmark transfer.
///
/// Always a whole number of MiB, so it is a multiple of the 512-byte
/// alignment boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransferSize {
    bytes: u64,
}

impl TransferSize {
    /// Resolve a size given in MiB. Zero selects [`DEFAULT_SIZE_MIB`].
    pub fn from_mib(mib: u32) -> Self {
        let mib = if mib == 0 { DEFAULT_SIZE_MIB } else { mib };
        Self {
            bytes: u64::from(mib) * MIB,
        }
    }

    /// Size in bytes.
    pub fn bytes(self) -> u64 {
        self.bytes
    }

    /// Size in MiB.
    pub fn mib(self) -> u64 {
        self.bytes / MIB
    }
}

impl Default for TransferSize {
    fn default() -> Self {
        Self::from_mib(DEFAULT_SIZE_MIB)
    }
}

impl fmt::Display for TransferSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MiB", self.mib())
    }
}

/// Benchmark settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    /// Bytes moved by each transfer.
    pub size: TransferSize,
    /// Open with `O_DIRECT` (or `F_NOCACHE`). Disable only for targets that
    /// reject unbuffered I/O, such as files on tmpfs.
    pub direct: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            size: TransferSize::default(),
            direct: true,
        }
    }
}

impl BenchConfig {
    /// Default settings with the given transfer size.
    pub fn with_size(size: TransferSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

/// Result of one timed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Direction of the transfer.
    pub direction: AccessMode,
    /// Bytes asked of the transfer call.
    pub requested_bytes: u64,
    /// Bytes the transfer call actually moved.
    pub bytes_transferred: u64,
    /// Wall-clock duration of the timed region, always positive.
    pub elapsed_seconds: f64,
    /// `bytes_transferred` in MiB divided by `elapsed_seconds`.
    pub throughput_mbps: f64,
}

impl BenchmarkResult {
    /// Build a result from a completed transfer.
    ///
    /// A non-positive duration yields [`IoFault::MeasurementFault`] instead
    /// of an infinite or NaN throughput.
    pub fn measured(
        direction: AccessMode,
        requested_bytes: u64,
        bytes_transferred: u64,
        elapsed: Duration,
    ) -> Result<Self, IoFault> {
        let elapsed_seconds = elapsed.as_secs_f64();
        if elapsed_seconds <= 0.0 {
            return Err(IoFault::MeasurementFault { elapsed });
        }

        Ok(Self {
            direction,
            requested_bytes,
            bytes_transferred,
            elapsed_seconds,
            throughput_mbps: bytes_transferred as f64 / MIB as f64 / elapsed_seconds,
        })
    }

    /// Whether the device moved fewer bytes than requested.
    pub fn is_short(&self) -> bool {
        self.bytes_transferred < self.requested_bytes
    }

    /// `bytes_transferred` in MiB.
    pub fn megabytes(&self) -> f64 {
        self.bytes_transferred as f64 / MIB as f64
    }
}

/// Which transfer call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    /// `read(2)`
    Read,
    /// `write(2)`
    Write,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read()"),
            Self::Write => f.write_str("write()"),
        }
    }
}

/// Faults that end a benchmark invocation.
///
/// By the time a fault is returned, the device handle and transfer buffer of
/// the failed invocation have been released.
#[derive(Error, Debug)]
pub enum IoFault {
    /// The device could not be opened for the benchmark.
    #[error("cannot open {device}: {}", describe_io_error(.error))]
    DeviceUnavailable {
        /// Device that failed to open.
        device: DeviceRef,
        /// Error returned by the open call.
        error: io::Error,
    },

    /// The aligned transfer buffer could not be allocated.
    #[error("can't allocate {size} bytes of memory aligned to 512 bytes")]
    AllocationFailed {
        /// Requested buffer length in bytes.
        size: u64,
    },

    /// The read or write call returned an error, or a read returned no data.
    #[error("error in {op} on {device}: {}", describe_io_error(.error))]
    TransferFailed {
        /// The failing call.
        op: TransferOp,
        /// Device being transferred to or from.
        device: DeviceRef,
        /// Error returned by the call.
        error: io::Error,
    },

    /// The durability flush failed after a successful write.
    #[error("error in fsync() on {device}: {}", describe_io_error(.error))]
    SyncFailed {
        /// Device being flushed.
        device: DeviceRef,
        /// Error returned by the flush.
        error: io::Error,
    },

    /// The timed region did not measure a positive duration.
    #[error("measured duration {elapsed:?} is not positive; throughput is undefined")]
    MeasurementFault {
        /// The offending duration.
        elapsed: Duration,
    },

    /// A write source buffer does not match the requested transfer size.
    #[error("source buffer holds {actual} bytes but {expected} bytes were requested")]
    BufferMismatch {
        /// Requested transfer size.
        expected: u64,
        /// Length of the buffer supplied.
        actual: u64,
    },
}

impl IoFault {
    /// The platform error behind this fault, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::DeviceUnavailable { error, .. }
            | Self::TransferFailed { error, .. }
            | Self::SyncFailed { error, .. } => Some(error),
            Self::AllocationFailed { .. }
            | Self::MeasurementFault { .. }
            | Self::BufferMismatch { .. } => None,
        }
    }

    /// Short description of the platform error, if any.
    pub fn reason(&self) -> Option<String> {
        self.io_error().map(describe_io_error)
    }
}

/// Runs read and write benchmarks through a [`DeviceOpener`].
#[derive(Debug, Clone, Default)]
pub struct Benchmarker<O = SystemOpener> {
    opener: O,
    config: BenchConfig,
}

impl<O: DeviceOpener> Benchmarker<O> {
    /// Create a benchmarker.
    pub fn new(opener: O, config: BenchConfig) -> Self {
        Self { opener, config }
    }
}
