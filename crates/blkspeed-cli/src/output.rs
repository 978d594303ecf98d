//! Human-readable and JSON rendering of results.

use std::fmt::Write as _;

use serde::Serialize;

use blkspeed_core::{AccessMode, BenchmarkResult, DeviceRecord, DeviceRef};

/// Benchmarks run against one device, as emitted with `--json`.
#[derive(Debug, Serialize)]
pub struct BenchReport<'a> {
    pub device: &'a DeviceRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<BenchmarkResult>,
}

/// Label that prefixes a benchmark line.
fn speed_label(direction: AccessMode) -> &'static str {
    match direction {
        AccessMode::Read => "Reading speed",
        AccessMode::Write => "Writing speed",
    }
}

/// `Reading speed: <n> bytes (<mb> MB), <s> s, <mbps> MB/s`
pub fn format_speed(result: &BenchmarkResult) -> String {
    format!(
        "{}: {} bytes ({:.2} MB), {:.6} s, {:.2} MB/s",
        speed_label(result.direction),
        result.bytes_transferred,
        result.megabytes(),
        result.elapsed_seconds,
        result.throughput_mbps,
    )
}

/// Header printed before the benchmarks of one device.
pub fn format_bench_header(device: &DeviceRef) -> String {
    format!("Device node path: {device}")
}

/// One enumerated disk, terminated by a blank line.
pub fn format_record(record: &DeviceRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Device Node Path: {}", record.node_path);
    if let Some(model) = &record.model {
        let _ = writeln!(out, "Model: {model}");
    }
    let _ = writeln!(out, "Read check: {}", record.access.read);
    let _ = writeln!(out, "Write check: {}", record.access.write);
    out
}

/// Warning shown before the destructive write benchmark.
pub fn write_warning(device: &DeviceRef, bytes: u64) -> String {
    format!(
        "WARNING: the write check overwrites the first {bytes} bytes of {device} \
         with data just read from it. YOUR DATA MAY BE LOST if the write fails."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use blkspeed_core::{AccessProbeResult, AccessReport};

    fn result(direction: AccessMode, bytes: u64, seconds: f64) -> BenchmarkResult {
        BenchmarkResult {
            direction,
            requested_bytes: bytes,
            bytes_transferred: bytes,
            elapsed_seconds: seconds,
            throughput_mbps: bytes as f64 / 1048576.0 / seconds,
        }
    }

    #[test]
    fn test_format_read_speed() {
        let line = format_speed(&result(AccessMode::Read, 104857600, 0.5));
        assert_eq!(line, "Reading speed: 104857600 bytes (100.00 MB), 0.500000 s, 200.00 MB/s");
    }

    #[test]
    fn test_format_write_speed() {
        let line = format_speed(&result(AccessMode::Write, 52428800, 2.0));
        assert_eq!(line, "Writing speed: 52428800 bytes (50.00 MB), 2.000000 s, 25.00 MB/s");
    }

    #[test]
    fn test_format_record_with_model() {
        let record = DeviceRecord {
            node_path: DeviceRef::new("/dev/sda"),
            model: Some("SSD123".to_string()),
            access: AccessReport {
                read: AccessProbeResult::Accessible,
                write: AccessProbeResult::Denied("Permission denied".to_string()),
            },
        };

        assert_eq!(
            format_record(&record),
            "Device Node Path: /dev/sda\nModel: SSD123\nRead check: OK\nWrite check: Permission denied\n"
        );
    }

    #[test]
    fn test_format_record_without_model() {
        let record = DeviceRecord {
            node_path: DeviceRef::new("/dev/nvme0n1"),
            model: None,
            access: AccessReport {
                read: AccessProbeResult::Accessible,
                write: AccessProbeResult::Accessible,
            },
        };

        assert!(!format_record(&record).contains("Model:"));
    }

    #[test]
    fn test_report_omits_missing_directions() {
        let device = DeviceRef::new("/dev/sda");
        let report = BenchReport {
            device: &device,
            read: Some(result(AccessMode::Read, 1048576, 1.0)),
            write: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["device"], "/dev/sda");
        assert_eq!(json["read"]["direction"], "read");
        assert!(json.get("write").is_none());
    }
}
