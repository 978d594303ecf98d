//! Error types for the blkspeed-core crate
//!
//! Benchmark faults live next to the benchmarks and enumeration errors next to
//! the enumerator; this module re-exports both and owns the helper that turns
//! a platform error into the short description shown to users.

use std::io;

pub use crate::bench::{IoFault, TransferOp};
pub use crate::enumerate::EnumerateError;

/// Describe an I/O error the way `strerror` would.
///
/// OS errors render as their bare description ("Permission denied") without
/// the `(os error N)` suffix; anything else falls back to `Display`. The
/// result is never empty.
pub fn describe_io_error(error: &io::Error) -> String {
    let text = error.to_string();
    let description = match error.raw_os_error() {
        Some(code) => text
            .strip_suffix(&format!(" (os error {code})"))
            .unwrap_or(&text)
            .to_string(),
        None => text,
    };

    if description.is_empty() {
        format!("{:?}", error.kind())
    } else {
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_describe_os_error_has_no_code_suffix() {
        let error = io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(describe_io_error(&error), "Permission denied");
    }

    #[test]
    fn test_describe_custom_error() {
        let error = io::Error::other("device went away");
        assert_eq!(describe_io_error(&error), "device went away");
    }

    #[test]
    fn test_describe_empty_message_falls_back_to_kind() {
        let error = io::Error::new(io::ErrorKind::TimedOut, "");
        assert_eq!(describe_io_error(&error), "TimedOut");
    }
}
