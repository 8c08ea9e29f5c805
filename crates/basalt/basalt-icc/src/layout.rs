//! Binary layout of a ring segment.
//!
//! The segment bytes are exactly:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ RingHeader                                                   │
//! │  magic ─ version ─ capacity ─ elem_size ─ elem_align ─       │
//! │  write_seq (atomic)                                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Slot[0]   { generation, valid, T }                           │
//! │ Slot[1]                                                      │
//! │ ...                                                          │
//! │ Slot[capacity-1]                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no serialization: writer and readers must be built with an
//! identical `T`. The header carries the layout identity (element size
//! and alignment, capacity, format version) so a mismatched build is
//! rejected on open instead of reading garbage.

use crate::slot::Slot;
use std::mem::{align_of, size_of};
use std::sync::atomic::AtomicU64;

/// Identifies a basalt ring segment ("BASALTRG" in ASCII).
pub const RING_MAGIC: u64 = 0x4241_5341_4C54_5247;

/// Current segment format version; bump on any incompatible change.
pub const RING_VERSION: u64 = 1;

/// Header at offset 0 of every ring segment.
///
/// `#[repr(C)]` keeps the field order and padding identical across the
/// builds sharing the segment.
#[repr(C)]
pub struct RingHeader {
    pub magic: u64,
    pub version: u64,
    /// Number of slots; always a power of two.
    pub capacity: u64,
    /// `size_of` the element type of the producing build.
    pub elem_size: u64,
    /// `align_of` the element type of the producing build.
    pub elem_align: u64,
    /// Monotonically increasing count of published elements. The writer
    /// stores it with release ordering only after the slot's write is
    /// complete; a reader that observes a count has the corresponding
    /// slot contents published to it.
    pub write_seq: AtomicU64,
}

impl RingHeader {
    /// Checks this header against the opening build's expectations.
    pub fn validate<T: Copy>(&self) -> Result<(), crate::error::LayoutError> {
        use crate::error::LayoutError;

        if self.magic != RING_MAGIC {
            return Err(LayoutError::BadMagic { found: self.magic });
        }
        if self.version != RING_VERSION {
            return Err(LayoutError::Version {
                found: self.version,
                expected: RING_VERSION,
            });
        }
        if !(self.capacity as usize).is_power_of_two() {
            return Err(LayoutError::Capacity(self.capacity));
        }
        if self.elem_size != size_of::<T>() as u64 {
            return Err(LayoutError::ElemSize {
                found: self.elem_size,
                expected: size_of::<T>() as u64,
            });
        }
        if self.elem_align != align_of::<T>() as u64 {
            return Err(LayoutError::ElemAlign {
                found: self.elem_align,
                expected: align_of::<T>() as u64,
            });
        }
        Ok(())
    }
}

/// Byte offset of `Slot[0]`: the header size rounded up to the slot
/// alignment. The mapping base is page-aligned, so this offset alone
/// decides slot alignment.
pub(crate) fn slots_offset<T: Copy>() -> usize {
    let align = align_of::<Slot<T>>();
    (size_of::<RingHeader>() + align - 1) & !(align - 1)
}

/// Total bytes a ring segment needs for `capacity` slots of `T`.
pub fn bytes_for_ring<T: Copy>(capacity: usize) -> usize {
    slots_offset::<T>() + capacity * size_of::<Slot<T>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_for<T: Copy>(capacity: u64) -> RingHeader {
        RingHeader {
            magic: RING_MAGIC,
            version: RING_VERSION,
            capacity,
            elem_size: size_of::<T>() as u64,
            elem_align: align_of::<T>() as u64,
            write_seq: AtomicU64::new(0),
        }
    }

    #[test]
    fn valid_header_passes() {
        assert!(header_for::<u64>(64).validate::<u64>().is_ok());
    }

    #[test]
    fn wrong_element_type_is_rejected() {
        use crate::error::LayoutError;
        let header = header_for::<u64>(64);
        assert!(matches!(
            header.validate::<u32>(),
            Err(LayoutError::ElemSize { .. })
        ));
    }

    #[test]
    fn corrupted_header_is_rejected() {
        use crate::error::LayoutError;

        let mut header = header_for::<u64>(64);
        header.magic = 0;
        assert!(matches!(
            header.validate::<u64>(),
            Err(LayoutError::BadMagic { .. })
        ));

        let mut header = header_for::<u64>(64);
        header.version = RING_VERSION + 1;
        assert!(matches!(
            header.validate::<u64>(),
            Err(LayoutError::Version { .. })
        ));

        let header = header_for::<u64>(63);
        assert!(matches!(
            header.validate::<u64>(),
            Err(LayoutError::Capacity(63))
        ));
    }

    #[test]
    fn ring_size_covers_header_and_slots() {
        let bytes = bytes_for_ring::<u64>(8);
        assert!(bytes >= size_of::<RingHeader>() + 8 * size_of::<Slot<u64>>());
        assert_eq!(slots_offset::<u64>() % align_of::<Slot<u64>>(), 0);
    }
}
