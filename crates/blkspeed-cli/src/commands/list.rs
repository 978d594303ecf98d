//! List command - show fixed disks and whether they can be opened.
//!
//! # Examples
//!
//! ```bash
//! # Human-readable listing
//! blkspeed -l
//!
//! # Output as JSON for scripting
//! blkspeed -l --json
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use tracing::instrument;

use blkspeed_core::{list_devices_with, SysfsRegistry, SystemOpener};

use crate::output::format_record;

#[instrument(level = "info", name = "cmd::list", skip_all, fields(sysfs = %sysfs_root.display()))]
pub fn execute(sysfs_root: &Path, dev_root: &Path, json: bool) -> Result<()> {
    let registry = SysfsRegistry::new(sysfs_root, dev_root)?;
    let records = list_devices_with(&registry, &SystemOpener).context("failed to list hard drives")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{}", format_record(record));
        }
    }

    Ok(())
}
