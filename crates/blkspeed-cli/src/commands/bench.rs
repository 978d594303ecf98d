//! Read and write speed commands.
//!
//! The write check first reads the region it is about to overwrite and then
//! writes the whole buffer back. After a full read the device ends up
//! unchanged; after a short read the unread tail of the region is
//! overwritten with zeros.

use anyhow::{Context, Result};
use tracing::instrument;

use blkspeed_core::{BenchConfig, Benchmarker, DeviceRef, SystemOpener};

use crate::output::{format_bench_header, format_speed, write_warning, BenchReport};

/// Time one read from `device`.
#[instrument(level = "info", name = "cmd::read", skip_all, fields(device = %device))]
pub fn read(device: &DeviceRef, config: BenchConfig, json: bool) -> Result<()> {
    let bench = Benchmarker::new(SystemOpener, config);
    if !json {
        println!("{}", format_bench_header(device));
    }

    let result = bench
        .read(device)
        .with_context(|| format!("read check failed on {device}"))?;

    if json {
        let report = BenchReport {
            device,
            read: Some(result),
            write: None,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_speed(&result));
        println!();
    }
    Ok(())
}

/// Read the start of `device`, then write the same bytes back, timing both.
#[instrument(level = "info", name = "cmd::write", skip_all, fields(device = %device))]
pub fn write(device: &DeviceRef, config: BenchConfig, json: bool) -> Result<()> {
    let bench = Benchmarker::new(SystemOpener, config);
    eprintln!("{}", write_warning(device, config.size.bytes()));
    if !json {
        println!("{}", format_bench_header(device));
    }

    let (read, buffer) = bench
        .read_retaining(device)
        .with_context(|| format!("read check failed on {device}"))?
        .into_parts();
    if !json {
        println!("{}", format_speed(&read));
    }

    let written = bench
        .write(device, buffer)
        .with_context(|| format!("write check failed on {device}"))?;

    if json {
        let report = BenchReport {
            device,
            read: Some(read),
            write: Some(written),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_speed(&written));
        println!();
    }
    Ok(())
}
