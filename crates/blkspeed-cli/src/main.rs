#![deny(unsafe_code)]

// Use mimalloc for reduced allocation latency (enabled by default).
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;
mod commands;
mod exit_code;
mod output;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use blkspeed_core::{DeviceRef, EnumerateError, IoFault};

use crate::cli::Cli;
use crate::commands::{bench, list};

fn main() -> ExitCode {
    // Running without arguments prints usage and succeeds.
    if std::env::args_os().len() < 2 {
        eprintln!("{}", Cli::command().render_help());
        return ExitCode::from(exit_code::SUCCESS);
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                exit_code::USAGE
            } else {
                exit_code::SUCCESS
            };
            return ExitCode::from(code);
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    if !cli.has_action() {
        eprintln!("{}", Cli::command().render_help());
        return Ok(());
    }

    if cli.list {
        list::execute(&cli.sysfs_root, &cli.dev_root, cli.json)?;
    }

    let config = cli.bench_config();
    tracing::debug!(size = %config.size, direct = config.direct, "benchmark settings");

    if let Some(path) = &cli.write {
        bench::write(&DeviceRef::new(path), config, cli.json)?;
    }

    if let Some(path) = &cli.read {
        bench::read(&DeviceRef::new(path), config, cli.json)?;
    }

    Ok(())
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(fault) = cause.downcast_ref::<IoFault>() {
            return match fault {
                IoFault::DeviceUnavailable { .. } => exit_code::DEVICE_UNAVAILABLE,
                IoFault::TransferFailed { .. } | IoFault::SyncFailed { .. } => exit_code::IO_FAULT,
                IoFault::AllocationFailed { .. }
                | IoFault::MeasurementFault { .. }
                | IoFault::BufferMismatch { .. } => exit_code::GENERAL_ERROR,
            };
        }

        if cause.downcast_ref::<EnumerateError>().is_some() {
            return exit_code::REGISTRY_UNAVAILABLE;
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                    return exit_code::DEVICE_UNAVAILABLE;
                }
                _ => {}
            }
        }
    }

    exit_code::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn test_open_failure_is_device_unavailable() {
        let fault = IoFault::DeviceUnavailable {
            device: DeviceRef::new("/dev/sdz"),
            error: io::Error::from(io::ErrorKind::NotFound),
        };
        let err = Err::<(), _>(fault).context("read check failed").unwrap_err();
        assert_eq!(categorize_error(&err), exit_code::DEVICE_UNAVAILABLE);
    }

    #[test]
    fn test_transfer_and_sync_failures_are_io_faults() {
        let transfer = anyhow::Error::new(IoFault::TransferFailed {
            op: blkspeed_core::TransferOp::Write,
            device: DeviceRef::new("/dev/sdb"),
            error: io::Error::other("bad sector"),
        });
        let sync = anyhow::Error::new(IoFault::SyncFailed {
            device: DeviceRef::new("/dev/sdb"),
            error: io::Error::other("flush failed"),
        });

        assert_eq!(categorize_error(&transfer), exit_code::IO_FAULT);
        assert_eq!(categorize_error(&sync), exit_code::IO_FAULT);
    }

    #[test]
    fn test_registry_failure() {
        let err = anyhow::Error::new(EnumerateError::RegistryUnavailable {
            root: PathBuf::from("/sys"),
            error: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(categorize_error(&err), exit_code::REGISTRY_UNAVAILABLE);
    }

    #[test]
    fn test_allocation_failure_is_general() {
        let err = anyhow::Error::new(IoFault::AllocationFailed { size: 1 << 40 });
        assert_eq!(categorize_error(&err), exit_code::GENERAL_ERROR);
    }

    #[test]
    fn test_plain_message_is_general() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(categorize_error(&err), exit_code::GENERAL_ERROR);
    }
}
