//! Alignment-compliant transfer buffers.
//!
//! Direct I/O requires the buffer address and transfer length to respect the
//! device's logical block size. [`AlignedBuffer`] allocates on a 512-byte
//! boundary, zero-fills eagerly and frees itself on drop, so no exit path
//! (including a fault after allocation) can leak it.

use std::fmt;

use aligned_vec::{AVec, ConstAlign};

use crate::bench::{IoFault, TransferSize};

/// Start-address alignment of every [`AlignedBuffer`].
pub const ALIGNMENT: usize = 512;

/// Largest buffer handed out.
///
/// Linux moves at most `0x7fff_f000` bytes in a single `read(2)` or
/// `write(2)`, so a larger buffer could never be filled by one transfer.
pub const MAX_LEN: usize = 0x7fff_f000;

/// Heap buffer aligned to [`ALIGNMENT`] bytes.
pub struct AlignedBuffer {
    data: AVec<u8, ConstAlign<ALIGNMENT>>,
}

impl AlignedBuffer {
    /// Allocate `len` zeroed bytes aligned to [`ALIGNMENT`].
    ///
    /// Fails with [`IoFault::AllocationFailed`] for a zero length or one
    /// above [`MAX_LEN`]; nothing is allocated in either case.
    pub fn zeroed(len: usize) -> Result<Self, IoFault> {
        if len == 0 || len > MAX_LEN {
            return Err(IoFault::AllocationFailed { size: len as u64 });
        }

        // Touch every page now so page faults land outside the timed region.
        let mut data = AVec::with_capacity(ALIGNMENT, len);
        for _ in 0..len {
            data.push(0);
        }

        Ok(Self { data })
    }

    /// Allocate a zeroed buffer sized for `size`.
    pub fn for_transfer(size: TransferSize) -> Result<Self, IoFault> {
        let len = usize::try_from(size.bytes())
            .map_err(|_| IoFault::AllocationFailed { size: size.bytes() })?;
        Self::zeroed(len)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; zero-length buffers cannot be allocated.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// The buffer contents, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len())
            .field("align", &ALIGNMENT)
            .finish_non_exhaustive()
    }
}
