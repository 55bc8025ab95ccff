//! RAII slice ownership
//!
//! A [`SliceAllocation`] is the handle a caller holds for one
//! allocated slice: it remembers the owning area so the slice can be
//! returned without re-deriving the pool, and it frees the slot on
//! drop. Move-only; at most one handle refers to a given slot.

use crate::area::AreaRef;
use std::ptr::NonNull;

/// Exclusive claim on one slice within an area.
pub struct SliceAllocation {
    area: AreaRef,
    /// `None` once the slice has been freed or stolen.
    data: Option<NonNull<u8>>,
    size: usize,
}

impl SliceAllocation {
    pub(crate) fn new(area: AreaRef, data: NonNull<u8>, size: usize) -> Self {
        Self {
            area,
            data: Some(data),
            size,
        }
    }

    /// Whether this handle still owns a slice.
    pub fn is_defined(&self) -> bool {
        self.data.is_some()
    }

    /// The slice size; every allocation from one pool has the same.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Handle to the owning area; needed to free a stolen pointer.
    pub fn area(&self) -> AreaRef {
        AreaRef::clone(&self.area)
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.data
            .expect("undefined slice allocation dereferenced")
            .as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.as_ptr(), self.size) }
    }

    /// Return the slice to its area now instead of at drop time.
    pub fn free(&mut self) {
        debug_assert!(self.is_defined());
        self.release();
    }

    /// Extract the raw pointer without freeing the slot. The caller
    /// takes over the claim and must eventually free the pointer
    /// through the owning [`area`](Self::area).
    pub fn steal(&mut self) -> NonNull<u8> {
        self.data
            .take()
            .expect("stole from an undefined slice allocation")
    }

    fn release(&mut self) {
        if let Some(data) = self.data.take() {
            self.area.borrow_mut().free(data);
        }
    }
}

impl Drop for SliceAllocation {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Result;
    use crate::pool::SlicePool;

    #[test]
    fn test_drop_frees_the_slot() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let allocation = pool.alloc();
        let area = allocation.area();
        assert_eq!(area.borrow().free_count(), 7);

        drop(allocation);
        assert_eq!(area.borrow().free_count(), 8);

        Ok(())
    }

    #[test]
    fn test_explicit_free() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let mut allocation = pool.alloc();
        assert!(allocation.is_defined());
        assert_eq!(allocation.size(), 512);

        allocation.free();
        assert!(!allocation.is_defined());

        Ok(())
    }

    #[test]
    fn test_steal_transfers_the_claim() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let mut allocation = pool.alloc();
        let area = allocation.area();
        let p = allocation.steal();
        assert!(!allocation.is_defined());

        // dropping the emptied handle must not free the slot
        drop(allocation);
        assert_eq!(area.borrow().free_count(), 7);

        area.borrow_mut().free(p);
        assert_eq!(area.borrow().free_count(), 8);

        Ok(())
    }

    #[test]
    fn test_slice_views() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let mut allocation = pool.alloc();
        allocation.as_mut_slice().fill(0x42);
        assert_eq!(allocation.as_slice().len(), 512);
        assert!(allocation.as_slice().iter().all(|&b| b == 0x42));

        Ok(())
    }
}
