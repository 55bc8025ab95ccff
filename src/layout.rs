//! Area geometry computation
//!
//! Pure sizing module: given a requested slice size and a target
//! number of slices per area, derive the page-aligned geometry of one
//! area mapping. Computed once when a pool is created, immutable
//! afterwards.

use crate::page::PAGE_SIZE;
use crate::slot::Slot;
use serde::Serialize;

/// Derived geometry of one slice area.
///
/// Small slices (at most half a page) are rounded up to a 32-byte
/// boundary and packed several per page; large slices are rounded up
/// to whole pages and span several pages each. The two packings are
/// mutually exclusive: either `slices_per_page` or `pages_per_slice`
/// is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlabLayout {
    /// Rounded slice size in bytes.
    pub slice_size: usize,
    /// Number of slices that fit on one MMU page.
    pub slices_per_page: u32,
    pub pages_per_slice: u32,
    /// Number of payload pages per area.
    pub pages_per_area: u32,
    pub slices_per_area: u32,
    /// Number of pages holding the area header (the free-list slot
    /// table).
    pub header_pages: u32,
    /// Total bytes per area mapping, header included.
    pub area_size: usize,
}

fn align_size(size: usize) -> usize {
    (size + 0x1f) & !0x1f
}

fn align_to_page_size(size: usize) -> usize {
    (size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

fn divide_round_up(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// Bytes needed for the area header: one free-list entry per slot.
fn header_size(slices_per_area: u32) -> usize {
    slices_per_area as usize * std::mem::size_of::<Slot>()
}

impl SlabLayout {
    /// Compute the geometry for `slices_per_area` slices of
    /// `slice_size` bytes each.
    ///
    /// Pure arithmetic, no error conditions; the caller guarantees
    /// both arguments are positive and within the bounds enforced by
    /// [`SlicePool::new`](crate::pool::SlicePool::new).
    pub fn compute(slice_size: usize, slices_per_area: u32) -> Self {
        assert!(slice_size > 0);
        assert!(slices_per_area > 0);

        let (slice_size, slices_per_page, pages_per_slice, pages_per_area) =
            if slice_size <= PAGE_SIZE / 2 {
                let rounded = align_size(slice_size);
                let per_page = (PAGE_SIZE / rounded) as u32;

                (rounded, per_page, 1, divide_round_up(slices_per_area, per_page))
            } else {
                let rounded = align_to_page_size(slice_size);
                let pages = (rounded / PAGE_SIZE) as u32;

                (rounded, 1, pages, slices_per_area * pages)
            };

        let slices_per_area = (pages_per_area / pages_per_slice) * slices_per_page;
        assert!(slices_per_area < Slot::END_OF_LIST);

        let header_pages =
            divide_round_up(header_size(slices_per_area) as u32, PAGE_SIZE as u32);

        let area_size = PAGE_SIZE * (header_pages + pages_per_area) as usize;

        Self {
            slice_size,
            slices_per_page,
            pages_per_slice,
            pages_per_area,
            slices_per_area,
            header_pages,
            area_size,
        }
    }

    /// Byte offset of a payload page within the area mapping.
    pub fn page_offset(&self, page: u32) -> usize {
        debug_assert!(page <= self.pages_per_area);

        (self.header_pages + page) as usize * PAGE_SIZE
    }

    /// Byte offset of slice `index` within the area mapping.
    pub fn slice_offset(&self, index: u32) -> usize {
        debug_assert!(index < self.slices_per_area);

        let page = (index / self.slices_per_page) * self.pages_per_slice;
        let sub = (index % self.slices_per_page) as usize;

        self.page_offset(page) + sub * self.slice_size
    }

    /// Slot index for a byte offset within the area mapping.
    ///
    /// The offset must point at the start of a slice in the payload
    /// region; everything else is a caller bug and asserted.
    pub fn slice_index(&self, offset: usize) -> u32 {
        let header_bytes = self.header_pages as usize * PAGE_SIZE;
        assert!(
            offset >= header_bytes && offset < self.area_size,
            "offset outside the payload region"
        );

        let page = (offset / PAGE_SIZE) as u32 - self.header_pages;
        let sub = offset % PAGE_SIZE;
        assert!(sub % self.slice_size == 0, "offset not slice-aligned");
        assert!(
            page % self.pages_per_slice == 0,
            "offset inside a multi-page slice"
        );

        let index = (page / self.pages_per_slice) * self.slices_per_page
            + (sub / self.slice_size) as u32;
        assert!(index < self.slices_per_area);
        index
    }
}
