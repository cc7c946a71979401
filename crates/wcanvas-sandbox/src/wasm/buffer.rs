//! Buffer handles for guest-owned memory regions.
//!
//! A [`BufferHandle`] is a plain `{offset, length}` descriptor. It grants no
//! access by itself: the only way to turn one into bytes is
//! [`WasmInstance::copy_out`](super::WasmInstance::copy_out), which checks the
//! range against the instance's linear memory before copying.

use std::ops::Range;

use crate::error::{Result, SandboxError};

/// Location of a buffer inside guest linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    /// Byte offset into linear memory
    pub offset: u32,
    /// Length in bytes
    pub length: u32,
}

impl BufferHandle {
    /// Create a handle from an offset and length.
    pub fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Unpack a 64-bit value carrying the offset in the high 32 bits and the
    /// length in the low 32 bits.
    pub fn from_packed(packed: u64) -> Self {
        Self {
            offset: (packed >> 32) as u32,
            length: packed as u32,
        }
    }

    /// Pack into the same layout [`from_packed`](Self::from_packed) reads.
    pub fn pack(self) -> u64 {
        (u64::from(self.offset) << 32) | u64::from(self.length)
    }

    /// One past the last byte of the buffer.
    pub fn end(self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(self) -> bool {
        self.length == 0
    }

    /// Resolve the handle to a byte range within a memory of `memory_size`
    /// bytes, or fail if any part of it lies outside.
    pub(crate) fn checked_range(self, memory_size: usize) -> Result<Range<usize>> {
        if self.end() > memory_size as u64 {
            return Err(SandboxError::OutOfBounds {
                offset: self.offset,
                length: self.length,
                memory_size,
            });
        }
        let start = self.offset as usize;
        Ok(start..start + self.length as usize)
    }
}
