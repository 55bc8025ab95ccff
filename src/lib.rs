//! Slice memory allocator
//!
//! An allocator for large numbers of small fixed-size buffers, backed
//! by anonymous memory mappings ("areas") that are divided into
//! equal-size slices. The free list lives inside the mapped memory
//! itself, so allocate and free are O(1) with no bookkeeping heap
//! traffic.
//!
//! # Architecture
//!
//! ```text
//! SlicePool (one per slice size)
//!   ├─→ SliceArea #0  [header pages | slice | slice | slice | ...]
//!   ├─→ SliceArea #1  [header pages | slice | slice | slice | ...]
//!   └─→ ...
//!
//! SliceAllocation → back-reference to its area, freed on drop
//! SliceBuffer     → SliceAllocation + append-only fill cursor
//! ```
//!
//! Areas are created lazily and sized for peak load; the periodic
//! [`SlicePool::compress`] pass unmaps empty areas and advises the
//! kernel to reclaim the physical pages behind unused slices without
//! giving up the virtual mapping.
//!
//! A pool and its areas are single-threaded by contract: callers
//! serialize access from one owning thread or event loop.

#![warn(rust_2018_idioms)]

pub mod allocation;
pub mod area;
pub mod buffer;
pub mod layout;
pub mod page;
pub mod pool;
pub mod slot;
pub mod stats;

// Re-exports for convenience
pub use allocation::SliceAllocation;
pub use area::{AreaRef, SliceArea};
pub use buffer::SliceBuffer;
pub use layout::SlabLayout;
pub use page::PAGE_SIZE;
pub use pool::SlicePool;
pub use stats::AllocatorStats;

/// Slice pool error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid pool geometry: {0}")]
        Geometry(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
