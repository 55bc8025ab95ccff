//! Allocator statistics
//!
//! Gross/net accounting reported by
//! [`SlicePool::stats`](crate::pool::SlicePool::stats): brutto is
//! everything mapped, netto is what live slices actually occupy. The
//! gap is the memory the next compress pass can hand back to the
//! kernel.

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocatorStats {
    /// Bytes reserved in area mappings, headers included.
    pub brutto_size: u64,
    /// Bytes occupied by currently allocated slices.
    pub netto_size: u64,
}
