//! Write throughput benchmark.
//!
//! DESTRUCTIVE: the transfer overwrites the first bytes of the target device.
//! Nothing in the probing or enumeration paths reaches this module.

use std::time::Instant;

use tracing::instrument;

use crate::bench::{BenchConfig, BenchmarkResult, Benchmarker, IoFault, TransferOp, TransferSize};
use crate::buffer::AlignedBuffer;
use crate::device::{AccessMode, DeviceOpener, DeviceRef, OpenFlags, RawDevice, SystemOpener};

/// Measure write throughput of `device` on the host with direct I/O.
///
/// Writes `source` (which must be exactly `size` bytes) to the start of the
/// device and flushes it to stable storage. The buffer is consumed and freed
/// before this returns.
///
/// # Data loss
///
/// Whatever the device held in its first `size` bytes is replaced. Callers
/// must warn the user before invoking this.
pub fn measure_write(
    device: &DeviceRef,
    size: TransferSize,
    source: AlignedBuffer,
) -> Result<BenchmarkResult, IoFault> {
    Benchmarker::new(SystemOpener, BenchConfig::with_size(size)).write(device, source)
}

impl<O: DeviceOpener> Benchmarker<O> {
    /// Time one write of `source` to `device` followed by a flush.
    ///
    /// The timer stops only after the flush succeeds. A write error yields
    /// [`IoFault::TransferFailed`], a flush error [`IoFault::SyncFailed`];
    /// neither produces a throughput figure.
    #[instrument(level = "info", name = "bench::write", skip_all, fields(device = %device, size = %self.config.size))]
    pub fn write(&self, device: &DeviceRef, source: AlignedBuffer) -> Result<BenchmarkResult, IoFault> {
        let requested = self.config.size.bytes();
        if source.len() as u64 != requested {
            return Err(IoFault::BufferMismatch {
                expected: requested,
                actual: source.len() as u64,
            });
        }

        let flags = OpenFlags::benchmark(AccessMode::Write, self.config.direct);
        let mut handle = self
            .opener
            .open(device, flags)
            .map_err(|error| IoFault::DeviceUnavailable {
                device: device.clone(),
                error,
            })?;
        tracing::debug!("overwriting first {requested} bytes of {device}");

        let start = Instant::now();
        // A short count is not an error: the device may be full or smaller
        // than the request.
        let written = handle
            .write_once(source.as_slice())
            .map_err(|error| IoFault::TransferFailed {
                op: TransferOp::Write,
                device: device.clone(),
                error,
            })?;
        handle.sync().map_err(|error| IoFault::SyncFailed {
            device: device.clone(),
            error,
        })?;
        let elapsed = start.elapsed();
        drop(handle);
        drop(source);

        let result = BenchmarkResult::measured(AccessMode::Write, requested, written as u64, elapsed)?;
        if result.is_short() {
            tracing::warn!(requested, written = result.bytes_transferred, "short write to {device}");
        }
        tracing::debug!(
            bytes = result.bytes_transferred,
            seconds = result.elapsed_seconds,
            mbps = result.throughput_mbps,
            "write complete"
        );

        Ok(result)
    }
}
