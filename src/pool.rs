//! Slice pools
//!
//! A [`SlicePool`] owns an ordered collection of areas, routes
//! allocation requests to the first non-full area (creating areas on
//! demand), and drives pool-wide compaction. One pool serves exactly
//! one slice size; subsystems construct and pass their own pool
//! instance rather than sharing a global.

use crate::allocation::SliceAllocation;
use crate::area::{AreaRef, SliceArea};
use crate::buffer::SliceBuffer;
use crate::error::{Error, Result};
use crate::layout::SlabLayout;
use crate::stats::AllocatorStats;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

/// Upper bound on the slice count per area; keeps slot indices far
/// below the free-list sentinel values.
const MAX_SLICES_PER_AREA: u32 = 1 << 24;

/// Upper bound on the payload bytes of one area.
const MAX_AREA_PAYLOAD: u64 = 1 << 32;

/// A pool of equally-sized slices carved out of anonymous memory
/// areas.
///
/// Single-threaded by contract: no internal locking, callers
/// serialize access from one owning thread or event loop.
pub struct SlicePool {
    layout: SlabLayout,
    areas: Vec<AreaRef>,
    fork_cow: bool,
}

impl SlicePool {
    /// Create a pool of `slices_per_area` slices of `slice_size`
    /// bytes each per area. No memory is mapped until the first
    /// allocation.
    pub fn new(slice_size: usize, slices_per_area: u32) -> Result<Self> {
        if slice_size == 0 {
            return Err(Error::Geometry("slice size must be positive".to_string()));
        }
        if slices_per_area == 0 {
            return Err(Error::Geometry(
                "slices per area must be positive".to_string(),
            ));
        }
        if slices_per_area > MAX_SLICES_PER_AREA {
            return Err(Error::Geometry(format!(
                "slices per area {} exceeds maximum {}",
                slices_per_area, MAX_SLICES_PER_AREA
            )));
        }
        if slice_size as u64 * slices_per_area as u64 > MAX_AREA_PAYLOAD {
            return Err(Error::Geometry(format!(
                "area payload {} x {} exceeds {} bytes",
                slice_size, slices_per_area, MAX_AREA_PAYLOAD
            )));
        }

        let layout = SlabLayout::compute(slice_size, slices_per_area);
        info!(
            slice_size = layout.slice_size,
            slices_per_area = layout.slices_per_area,
            area_size = layout.area_size,
            "created slice pool"
        );

        Ok(Self {
            layout,
            areas: Vec::new(),
            fork_cow: true,
        })
    }

    /// The rounded slice size every allocation from this pool has.
    pub fn slice_size(&self) -> usize {
        self.layout.slice_size
    }

    pub fn layout(&self) -> &SlabLayout {
        &self.layout
    }

    /// Number of live areas.
    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// First non-full area, mapping a new one if every area is full.
    /// Linear scan; the area count stays small relative to the slice
    /// count per area.
    fn make_non_full_area(&mut self) -> AreaRef {
        if let Some(area) = self.areas.iter().find(|area| !area.borrow().is_full()) {
            return Rc::clone(area);
        }

        let area = SliceArea::new(&self.layout);
        if !self.fork_cow {
            area.fork_cow(false);
        }

        debug!(
            area_size = self.layout.area_size,
            areas = self.areas.len() + 1,
            "mapped new slice area"
        );

        let area = Rc::new(RefCell::new(area));
        self.areas.push(Rc::clone(&area));
        area
    }

    /// Allocate one slice. O(1) except when a new area must be
    /// mapped.
    pub fn alloc(&mut self) -> SliceAllocation {
        let area = self.make_non_full_area();
        let data = area.borrow_mut().alloc();

        SliceAllocation::new(area, data, self.layout.slice_size)
    }

    /// Allocate one slice wrapped in an append cursor.
    pub fn alloc_buffer(&mut self) -> SliceBuffer {
        SliceBuffer::new(self.alloc())
    }

    /// Pool-wide maintenance pass: unmap empty areas, punch unused
    /// pages out of the rest. O(total slices); run periodically off
    /// the hot path, not on every free.
    pub fn compress(&mut self) {
        let before = self.areas.len();

        self.areas.retain(|area| {
            let mut area = area.borrow_mut();
            if area.is_empty() {
                false
            } else {
                area.compress();
                true
            }
        });

        let released = before - self.areas.len();
        if released > 0 {
            debug!(
                released,
                remaining = self.areas.len(),
                "released empty slice areas"
            );
        }
    }

    /// Controls whether a forked child process inherits the pool's
    /// memory. Enabled by default; idempotent.
    pub fn fork_cow(&mut self, inherit: bool) {
        if inherit == self.fork_cow {
            return;
        }

        self.fork_cow = inherit;
        for area in &self.areas {
            area.borrow().fork_cow(inherit);
        }
    }

    /// Gross (mapped) vs. net (live slice) byte accounting across all
    /// areas.
    pub fn stats(&self) -> AllocatorStats {
        let mut stats = AllocatorStats::default();
        for area in &self.areas {
            stats.brutto_size += self.layout.area_size as u64;
            stats.netto_size += area.borrow().netto_size() as u64;
        }
        stats
    }
}

impl Drop for SlicePool {
    fn drop(&mut self) {
        // outstanding allocations keep their area mapping alive via
        // the shared handle; an area still holding slices here is a
        // caller leak
        debug_assert!(
            self.areas.iter().all(|area| area.borrow().is_empty()),
            "slice pool dropped with outstanding allocations"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PAGE_SIZE;

    #[test]
    fn test_rejects_degenerate_geometry() {
        assert!(SlicePool::new(0, 8).is_err());
        assert!(SlicePool::new(64, 0).is_err());
        assert!(SlicePool::new(1 << 20, 1 << 20).is_err());
    }

    #[test]
    fn test_slice_size_is_rounded() -> Result<()> {
        let pool = SlicePool::new(13, 600)?;
        assert_eq!(pool.slice_size(), 32);
        Ok(())
    }

    #[test]
    fn test_lazy_area_creation() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;
        assert_eq!(pool.area_count(), 0);

        let allocation = pool.alloc();
        assert_eq!(pool.area_count(), 1);
        drop(allocation);

        Ok(())
    }

    #[test]
    fn test_area_lifecycle() -> Result<()> {
        // large slices: exactly 4 slices per area
        let mut pool = SlicePool::new(PAGE_SIZE, 4)?;

        let mut allocations: Vec<_> = (0..5).map(|_| pool.alloc()).collect();
        assert_eq!(pool.area_count(), 2);

        // empty the first area, keep the fifth allocation live
        let last = allocations.pop().unwrap();
        allocations.clear();

        pool.compress();
        assert_eq!(pool.area_count(), 1);

        drop(last);
        pool.compress();
        assert_eq!(pool.area_count(), 0);

        Ok(())
    }

    #[test]
    fn test_full_area_reuse_scenario() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let mut allocations: Vec<_> = (0..8).map(|_| pool.alloc()).collect();
        assert_eq!(pool.area_count(), 1);

        // most-recently-freed slot is handed out first
        let freed = allocations.remove(3);
        let expected = freed.as_ptr();
        drop(freed);

        let again = pool.alloc();
        assert_eq!(again.as_ptr(), expected);
        assert_eq!(pool.area_count(), 1);

        drop(again);
        allocations.clear();
        pool.compress();
        assert_eq!(pool.area_count(), 0);

        Ok(())
    }

    #[test]
    fn test_stats_accounting() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;
        assert_eq!(pool.stats(), AllocatorStats::default());

        let allocations: Vec<_> = (0..3).map(|_| pool.alloc()).collect();
        let stats = pool.stats();
        assert_eq!(stats.brutto_size, pool.layout().area_size as u64);
        assert_eq!(stats.netto_size, 3 * 512);

        drop(allocations);
        let stats = pool.stats();
        assert_eq!(stats.netto_size, 0);
        assert_eq!(stats.brutto_size, pool.layout().area_size as u64);

        pool.compress();
        assert_eq!(pool.stats(), AllocatorStats::default());

        Ok(())
    }

    #[test]
    fn test_fork_cow_toggle() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let allocation = pool.alloc();
        pool.fork_cow(false);
        pool.fork_cow(false);
        pool.fork_cow(true);
        drop(allocation);

        Ok(())
    }
}
