//! End-to-end benchmark scenarios against scripted devices and real files.
//!
//! Scripted devices cover the fault paths a real disk rarely produces on
//! demand (short transfers, flush failures). The file-backed tests go through
//! `SystemOpener` with buffered I/O, since tmpfs rejects `O_DIRECT`.

use std::time::Duration;

use blkspeed_core::testing::{DeviceScript, IoEvent, ScriptedOpener, Transfer};
use blkspeed_core::{
    AccessMode, AlignedBuffer, BenchConfig, Benchmarker, DeviceRef, IoFault, SystemOpener,
    TransferOp, TransferSize, MIB,
};
use tempfile::NamedTempFile;

fn scripted(opener: &ScriptedOpener, mib: u32) -> Benchmarker<ScriptedOpener> {
    Benchmarker::new(opener.clone(), BenchConfig::with_size(TransferSize::from_mib(mib)))
}

fn buffered(mib: u32) -> Benchmarker<SystemOpener> {
    Benchmarker::new(
        SystemOpener,
        BenchConfig {
            size: TransferSize::from_mib(mib),
            direct: false,
        },
    )
}

// =============================================================================
// Read
// =============================================================================

#[test]
fn test_default_size_short_read() {
    let opener = ScriptedOpener::new().with_device(
        "/dev/sdb",
        DeviceScript::default()
            .read(Transfer::Short(52428800))
            .latency(Duration::from_millis(5)),
    );

    let result = scripted(&opener, 0).read(&DeviceRef::new("/dev/sdb")).unwrap();

    assert_eq!(result.requested_bytes, 104857600);
    assert_eq!(result.bytes_transferred, 52428800);
    assert!(result.is_short());
    assert!(result.elapsed_seconds > 0.0);
    let expected = 50.0 / result.elapsed_seconds;
    assert!((result.throughput_mbps - expected).abs() <= expected * 1e-9);
}

#[test]
fn test_read_of_missing_device_is_unavailable() {
    let opener = ScriptedOpener::new();

    let err = scripted(&opener, 1).read(&DeviceRef::new("/dev/nope")).unwrap_err();

    assert!(matches!(err, IoFault::DeviceUnavailable { .. }));
    assert_eq!(err.to_string(), "cannot open /dev/nope: No such file or directory");
    assert_eq!(opener.open_count(), 0);
}

#[test]
fn test_read_error_reports_transfer_fault() {
    let opener = ScriptedOpener::new()
        .with_device("/dev/sdb", DeviceScript::default().read(Transfer::Fail(libc::EIO)));

    let err = scripted(&opener, 1).read(&DeviceRef::new("/dev/sdb")).unwrap_err();

    assert!(matches!(err, IoFault::TransferFailed { op: TransferOp::Read, .. }));
    assert_eq!(opener.open_count(), 1);
    assert_eq!(opener.close_count(), 1);
}

#[test]
fn test_read_regular_file_buffered() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), vec![0x5Au8; 2 * MIB as usize]).unwrap();

    let result = buffered(2).read(&DeviceRef::new(file.path())).unwrap();

    assert_eq!(result.direction, AccessMode::Read);
    assert_eq!(result.bytes_transferred, 2 * MIB);
    assert!(!result.is_short());
}

#[test]
fn test_read_past_end_of_small_file_is_short() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), vec![1u8; 4096]).unwrap();

    let result = buffered(1).read(&DeviceRef::new(file.path())).unwrap();

    assert_eq!(result.bytes_transferred, 4096);
    assert!(result.is_short());
}

#[test]
fn test_read_of_empty_file_is_fault() {
    let file = NamedTempFile::new().unwrap();

    let err = buffered(1).read(&DeviceRef::new(file.path())).unwrap_err();

    assert!(matches!(err, IoFault::TransferFailed { op: TransferOp::Read, .. }));
    assert!(err.to_string().ends_with(": no data returned"));
}

// =============================================================================
// Write
// =============================================================================

#[test]
fn test_sync_failure_yields_no_result() {
    let opener = ScriptedOpener::new()
        .with_device("/dev/sdb", DeviceScript::default().sync_fails(libc::EIO));
    let source = AlignedBuffer::for_transfer(TransferSize::from_mib(1)).unwrap();

    let err = scripted(&opener, 1).write(&DeviceRef::new("/dev/sdb"), source).unwrap_err();

    assert!(matches!(err, IoFault::SyncFailed { .. }));
    assert!(err.to_string().starts_with("error in fsync() on /dev/sdb: "));
    assert_eq!(opener.close_count(), 1);
}

#[test]
fn test_write_regular_file_buffered() {
    let file = NamedTempFile::new().unwrap();
    let mut source = AlignedBuffer::for_transfer(TransferSize::from_mib(1)).unwrap();
    source.as_mut_slice()[..3].copy_from_slice(b"MBR");

    let result = buffered(1).write(&DeviceRef::new(file.path()), source).unwrap();

    assert_eq!(result.direction, AccessMode::Write);
    assert_eq!(result.bytes_transferred, MIB);
    let written = std::fs::read(file.path()).unwrap();
    assert_eq!(written.len() as u64, MIB);
    assert_eq!(&written[..3], b"MBR");
}

// =============================================================================
// Read then write
// =============================================================================

#[test]
fn test_read_buffer_written_back() {
    let opener = ScriptedOpener::new().with_device("/dev/sdb", DeviceScript::default().fill(0x42));
    let bench = scripted(&opener, 1);
    let device = DeviceRef::new("/dev/sdb");

    let measurement = bench.read_retaining(&device).unwrap();
    assert!(measurement.buffer().as_slice().iter().all(|&b| b == 0x42));

    let (read, buffer) = measurement.into_parts();
    let write = bench.write(&device, buffer).unwrap();

    assert_eq!(read.bytes_transferred, MIB);
    assert_eq!(write.bytes_transferred, MIB);
    assert_eq!(opener.written_prefix("/dev/sdb", 8), Some(vec![0x42; 8]));

    let kinds: Vec<_> = opener.events().iter().map(IoEvent::kind).collect();
    assert_eq!(kinds, vec!["open", "read", "close", "open", "write", "sync", "close"]);
}

#[test]
fn test_read_then_write_preserves_file_contents() {
    let file = NamedTempFile::new().unwrap();
    let original: Vec<u8> = (0..MIB).map(|i| (i % 251) as u8).collect();
    std::fs::write(file.path(), &original).unwrap();

    let bench = buffered(1);
    let device = DeviceRef::new(file.path());
    let buffer = bench.read_retaining(&device).unwrap().into_buffer();
    bench.write(&device, buffer).unwrap();

    assert_eq!(std::fs::read(file.path()).unwrap(), original);
}

#[test]
fn test_short_read_then_write_zero_fills_tail() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), vec![7u8; 4096]).unwrap();

    let bench = buffered(1);
    let device = DeviceRef::new(file.path());
    let measurement = bench.read_retaining(&device).unwrap();
    assert!(measurement.result.is_short());
    bench.write(&device, measurement.into_buffer()).unwrap();

    let contents = std::fs::read(file.path()).unwrap();
    assert_eq!(contents.len() as u64, MIB);
    assert!(contents[..4096].iter().all(|&b| b == 7));
    assert!(contents[4096..].iter().all(|&b| b == 0));
}
