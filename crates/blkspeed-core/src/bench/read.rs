//! Read throughput benchmark.

use std::io;
use std::time::Instant;

use tracing::instrument;

use crate::bench::{BenchConfig, BenchmarkResult, Benchmarker, IoFault, TransferOp, TransferSize};
use crate::buffer::AlignedBuffer;
use crate::device::{AccessMode, DeviceOpener, DeviceRef, OpenFlags, RawDevice, SystemOpener};

/// A read result together with the buffer it was read into.
///
/// The buffer can be passed on to [`Benchmarker::write`]; otherwise it is
/// freed when this value is dropped.
#[derive(Debug)]
pub struct ReadMeasurement {
    /// Timing of the read.
    pub result: BenchmarkResult,
    buffer: AlignedBuffer,
}

impl ReadMeasurement {
    /// The bytes read. Bytes past a short read are still zero.
    pub fn buffer(&self) -> &AlignedBuffer {
        &self.buffer
    }

    /// Take ownership of the buffer.
    pub fn into_buffer(self) -> AlignedBuffer {
        self.buffer
    }

    /// Split into result and buffer.
    pub fn into_parts(self) -> (BenchmarkResult, AlignedBuffer) {
        (self.result, self.buffer)
    }
}

/// Measure read throughput of `device` on the host with direct I/O.
pub fn measure_read(device: &DeviceRef, size: TransferSize) -> Result<BenchmarkResult, IoFault> {
    Benchmarker::new(SystemOpener, BenchConfig::with_size(size)).read(device)
}

/// Like [`measure_read`], but keeps the buffer for a following write.
pub fn measure_read_retaining(
    device: &DeviceRef,
    size: TransferSize,
) -> Result<ReadMeasurement, IoFault> {
    Benchmarker::new(SystemOpener, BenchConfig::with_size(size)).read_retaining(device)
}

impl<O: DeviceOpener> Benchmarker<O> {
    /// Time one read of the configured size from `device`.
    pub fn read(&self, device: &DeviceRef) -> Result<BenchmarkResult, IoFault> {
        self.read_retaining(device).map(|m| m.result)
    }

    /// Time one read of the configured size and keep the buffer.
    ///
    /// The device handle is closed before this returns, on every path. A
    /// read that returns no data at all is [`IoFault::TransferFailed`].
    #[instrument(level = "info", name = "bench::read", skip_all, fields(device = %device, size = %self.config.size))]
    pub fn read_retaining(&self, device: &DeviceRef) -> Result<ReadMeasurement, IoFault> {
        let flags = OpenFlags::benchmark(AccessMode::Read, self.config.direct);
        let mut handle = self
            .opener
            .open(device, flags)
            .map_err(|error| IoFault::DeviceUnavailable {
                device: device.clone(),
                error,
            })?;

        let requested = self.config.size.bytes();
        let mut buffer = AlignedBuffer::for_transfer(self.config.size)?;

        let start = Instant::now();
        let outcome = handle.read_once(buffer.as_mut_slice());
        let elapsed = start.elapsed();
        drop(handle);

        let transferred = outcome
            .and_then(|n| match n {
                0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no data returned")),
                n => Ok(n),
            })
            .map_err(|error| IoFault::TransferFailed {
                op: TransferOp::Read,
                device: device.clone(),
                error,
            })?;

        let result = BenchmarkResult::measured(AccessMode::Read, requested, transferred as u64, elapsed)?;
        if result.is_short() {
            tracing::warn!(
                requested,
                transferred = result.bytes_transferred,
                "short read from {device}"
            );
        }
        tracing::debug!(
            bytes = result.bytes_transferred,
            seconds = result.elapsed_seconds,
            mbps = result.throughput_mbps,
            "read complete"
        );

        Ok(ReadMeasurement { result, buffer })
    }
}
