//! Command-line definition.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use blkspeed_core::enumerate::{DEFAULT_DEV_ROOT, DEFAULT_SYSFS_ROOT};
use blkspeed_core::{BenchConfig, TransferSize};

/// Find hard drives in the system, show them, check read-write access and
/// measure raw read-write speed
#[derive(Parser, Debug)]
#[command(name = "blkspeed")]
#[command(author, version)]
#[command(after_help = "EXAMPLES:
    # List fixed disks and whether they can be opened
    blkspeed -l

    # Time a 100 MiB unbuffered read from the start of a disk
    sudo blkspeed -r /dev/sda

    # List, then time a 500 MiB read
    sudo blkspeed -l -r /dev/sda -s 500

    # Read then rewrite the first 100 MiB of a disk (data may be lost)
    sudo blkspeed -w /dev/sdb
")]
pub struct Cli {
    /// List hard drives in the system
    #[arg(short, long)]
    pub list: bool,

    /// Check reading speed of a device, e.g. /dev/sda
    #[arg(short, long, value_name = "DEVICE")]
    pub read: Option<PathBuf>,

    /// DANGER, YOUR DATA MAY BE LOST! Check read-write speed of a device
    #[arg(short, long, value_name = "DEVICE")]
    pub write: Option<PathBuf>,

    /// Size of data for checking read or write speed, in MiB (0 = 100)
    #[arg(short, long, value_name = "MIB", default_value_t = 0, env = "BLKSPEED_SIZE")]
    pub size: u32,

    /// Go through the page cache instead of opening with O_DIRECT
    #[arg(long)]
    pub buffered: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress logging and error messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Root of the sysfs tree to enumerate
    #[arg(long, value_name = "DIR", env = "BLKSPEED_SYSFS_ROOT", default_value = DEFAULT_SYSFS_ROOT, hide = true)]
    pub sysfs_root: PathBuf,

    /// Directory holding device nodes
    #[arg(long, value_name = "DIR", env = "BLKSPEED_DEV_ROOT", default_value = DEFAULT_DEV_ROOT, hide = true)]
    pub dev_root: PathBuf,
}

impl Cli {
    /// Whether any of `-l`, `-r` or `-w` was given.
    pub fn has_action(&self) -> bool {
        self.list || self.read.is_some() || self.write.is_some()
    }

    /// Benchmark settings from `-s` and `--buffered`.
    pub fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            size: TransferSize::from_mib(self.size),
            direct: !self.buffered,
        }
    }
}
