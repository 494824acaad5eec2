//! Bounded file regions
//!
//! A [`Region`] describes one contiguous slot array in the backing file:
//! base offset, element size, slot count. All catalog and table-data offset
//! arithmetic goes through it instead of loose byte math.

/// A contiguous range of fixed-size slots at an absolute file offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    offset: u64,
    elem_size: u32,
    slots: u32,
}

impl Region {
    pub fn new(offset: u64, elem_size: u32, slots: u32) -> Self {
        Self {
            offset,
            elem_size,
            slots,
        }
    }

    /// Absolute offset of the first slot
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of one slot in bytes
    pub fn elem_size(&self) -> u32 {
        self.elem_size
    }

    /// Total slot capacity
    pub fn slots(&self) -> u32 {
        self.slots
    }

    /// Total byte length of the region
    pub fn byte_len(&self) -> u64 {
        self.elem_size as u64 * self.slots as u64
    }

    /// Absolute offset one past the last slot
    pub fn end(&self) -> u64 {
        self.offset + self.byte_len()
    }

    /// Absolute offset of slot `index`
    ///
    /// `index` must be within the region's capacity.
    pub fn slot_offset(&self, index: u32) -> u64 {
        debug_assert!(index < self.slots, "slot {} out of {}", index, self.slots);
        self.offset + index as u64 * self.elem_size as u64
    }
}
