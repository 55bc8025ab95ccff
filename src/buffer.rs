//! Append-only slice buffers
//!
//! A [`SliceBuffer`] wraps one allocation with a fill cursor for code
//! that fills a slice-sized region incrementally and then exposes it
//! as a read-only byte range. It never grows or reallocates: writers
//! know the slice size up front, and overflow is a caller bug.

use crate::allocation::SliceAllocation;

pub struct SliceBuffer {
    allocation: SliceAllocation,
    fill: usize,
}

impl SliceBuffer {
    pub fn new(allocation: SliceAllocation) -> Self {
        Self {
            allocation,
            fill: 0,
        }
    }

    /// Fixed capacity: the slice size of the originating pool.
    pub fn capacity(&self) -> usize {
        self.allocation.size()
    }

    /// Number of bytes appended so far.
    pub fn len(&self) -> usize {
        self.fill
    }

    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    /// The filled prefix.
    pub fn read(&self) -> &[u8] {
        &self.allocation.as_slice()[..self.fill]
    }

    /// The writable tail. Bytes written here become readable after
    /// [`SliceBuffer::append`].
    pub fn write(&mut self) -> &mut [u8] {
        let fill = self.fill;
        &mut self.allocation.as_mut_slice()[fill..]
    }

    /// Mark `n` bytes of the writable tail as filled.
    pub fn append(&mut self, n: usize) {
        assert!(n <= self.capacity() - self.fill, "slice buffer overflow");
        self.fill += n;
    }

    /// Copy `data` into the writable tail and mark it filled.
    pub fn append_slice(&mut self, data: &[u8]) {
        assert!(
            data.len() <= self.capacity() - self.fill,
            "slice buffer overflow"
        );

        self.write()[..data.len()].copy_from_slice(data);
        self.fill += data.len();
    }

    /// Forget the filled bytes; the capacity is unchanged.
    pub fn clear(&mut self) {
        self.fill = 0;
    }

    /// Unwrap the underlying allocation, discarding the cursor.
    pub fn into_allocation(self) -> SliceAllocation {
        self.allocation
    }
}

impl From<SliceAllocation> for SliceBuffer {
    fn from(allocation: SliceAllocation) -> Self {
        Self::new(allocation)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Result;
    use crate::pool::SlicePool;

    #[test]
    fn test_incremental_fill() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let mut buffer = pool.alloc_buffer();
        assert_eq!(buffer.capacity(), 512);
        assert!(buffer.is_empty());
        assert_eq!(buffer.write().len(), 512);

        buffer.append_slice(b"hello ");
        buffer.append_slice(b"world");
        assert_eq!(buffer.read(), b"hello world");
        assert_eq!(buffer.len(), 11);
        assert_eq!(buffer.write().len(), 512 - 11);

        buffer.write()[0] = b'!';
        buffer.append(1);
        assert_eq!(buffer.read(), b"hello world!");

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 512);

        Ok(())
    }

    #[test]
    fn test_fill_to_capacity() -> Result<()> {
        let mut pool = SlicePool::new(512, 8)?;

        let mut buffer = pool.alloc_buffer();
        let n = buffer.capacity();
        buffer.write().fill(0x7f);
        buffer.append(n);

        assert_eq!(buffer.write().len(), 0);
        assert_eq!(buffer.read().len(), n);
        assert!(buffer.read().iter().all(|&b| b == 0x7f));

        Ok(())
    }

    #[test]
    #[should_panic(expected = "slice buffer overflow")]
    fn test_overflow_asserts() {
        let mut pool = SlicePool::new(512, 8).unwrap();

        let mut buffer = pool.alloc_buffer();
        buffer.append(513);
    }
}
