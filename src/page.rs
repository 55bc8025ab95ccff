//! Anonymous page-granular memory mappings
//!
//! Thin wrapper around mmap/munmap/madvise. Mapping failure is
//! treated as unrecoverable: an allocator that cannot obtain address
//! space has no sane fallback, so the process aborts.

use std::ptr::NonNull;
use tracing::error;

/// MMU page size the slice geometry is computed against.
pub const PAGE_SIZE: usize = 4096;

#[cfg(target_os = "linux")]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;

#[cfg(not(target_os = "linux"))]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

/// One anonymous, private, zero-initialized memory mapping.
///
/// The mapping is requested with `MAP_NORESERVE` so a large area does
/// not count against the kernel's overcommit reservation until its
/// pages are actually touched.
pub struct PageMap {
    base: NonNull<u8>,
    size: usize,
}

impl PageMap {
    /// Map `size` bytes of anonymous memory.
    ///
    /// `size` must be a whole multiple of [`PAGE_SIZE`]. Aborts the
    /// process if the kernel refuses the mapping.
    pub fn new(size: usize) -> Self {
        assert!(size > 0 && size % PAGE_SIZE == 0);

        let p = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                MAP_FLAGS,
                -1,
                0,
            )
        };

        if p == libc::MAP_FAILED {
            error!(
                size,
                errno = std::io::Error::last_os_error().raw_os_error(),
                "anonymous mapping failed"
            );
            std::process::abort();
        }

        let map = Self {
            base: unsafe { NonNull::new_unchecked(p as *mut u8) },
            size,
        };
        map.enable_huge_pages();
        map
    }

    #[cfg(target_os = "linux")]
    fn enable_huge_pages(&self) {
        unsafe {
            libc::madvise(self.base.as_ptr().cast(), self.size, libc::MADV_HUGEPAGE);
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn enable_huge_pages(&self) {}

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Advise the kernel that the given byte range will not be needed
    /// again; physical pages may be reclaimed and the range reads as
    /// zero-filled once re-touched. The virtual mapping stays valid.
    ///
    /// `offset` and `len` must be page-aligned and within the mapping.
    pub fn discard(&self, offset: usize, len: usize) {
        assert!(offset % PAGE_SIZE == 0 && len % PAGE_SIZE == 0);
        assert!(offset <= self.size && len <= self.size - offset);

        if len == 0 {
            return;
        }

        unsafe {
            libc::madvise(self.base.as_ptr().add(offset).cast(), len, libc::MADV_DONTNEED);
        }
    }

    /// Control what a newly created isolated execution context (a
    /// forked child) sees in this mapping: the inherited copy-on-write
    /// pages (`inherit == true`) or a fresh zero-filled region
    /// (`inherit == false`).
    #[cfg(target_os = "linux")]
    pub fn fork_cow(&self, inherit: bool) {
        let advice = if inherit {
            libc::MADV_KEEPONFORK
        } else {
            libc::MADV_WIPEONFORK
        };

        unsafe {
            libc::madvise(self.base.as_ptr().cast(), self.size, advice);
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn fork_cow(&self, _inherit: bool) {}
}

impl Drop for PageMap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base.as_ptr().cast(), self.size);
        }
    }
}
