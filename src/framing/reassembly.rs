//! Bounded accumulator for the data-plane byte stream.
//!
//! Owned by exactly one task: the one that appends is the one that scans and
//! consumes. No internal locking.

use bytes::{Buf, BytesMut};
use thiserror::Error;

use crate::core::constants::DEFAULT_REASSEMBLY_CAPACITY;

/// Reassembly errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyError {
    /// Appending would exceed capacity. The buffer has been reset to empty
    /// and the rejected chunk dropped.
    #[error("reassembly overflow: {attempted} bytes exceeds capacity of {capacity}")]
    Overflow {
        /// Length the buffer would have reached.
        attempted: usize,
        /// Configured capacity.
        capacity: usize,
    },
}

/// Append-only byte accumulator with a hard capacity.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    bytes: BytesMut,
    capacity: usize,
}

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REASSEMBLY_CAPACITY)
    }
}

impl ReassemblyBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `data`.
    ///
    /// On overflow the whole buffer is reset; data is never truncated and kept.
    pub fn append(&mut self, data: &[u8]) -> Result<(), ReassemblyError> {
        let attempted = self.bytes.len() + data.len();
        if attempted > self.capacity {
            self.bytes.clear();
            return Err(ReassemblyError::Overflow {
                attempted,
                capacity: self.capacity,
            });
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Remove the first `n` bytes, keeping the remainder in order.
    pub fn consume_prefix(&mut self, n: usize) {
        debug_assert!(n <= self.bytes.len(), "consumed past end of buffer");
        self.bytes.advance(n.min(self.bytes.len()));
    }

    /// Buffered bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
