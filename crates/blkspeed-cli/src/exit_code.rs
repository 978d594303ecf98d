//! Process exit codes.

/// Everything requested ran to completion.
pub const SUCCESS: u8 = 0;

/// Unclassified failure.
pub const GENERAL_ERROR: u8 = 1;

/// Bad command line.
pub const USAGE: u8 = 2;

/// A device node could not be opened (missing, permission, busy).
pub const DEVICE_UNAVAILABLE: u8 = 3;

/// A read, write or flush failed mid-benchmark.
pub const IO_FAULT: u8 = 4;

/// The device registry could not be read.
pub const REGISTRY_UNAVAILABLE: u8 = 5;
