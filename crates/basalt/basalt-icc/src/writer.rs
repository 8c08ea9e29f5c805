//! The creator side of a ring: owns the segment, initializes the layout,
//! publishes elements.

use crate::error::RingError;
use crate::layout::{RING_MAGIC, RING_VERSION, RingHeader, bytes_for_ring, slots_offset};
use crate::ring::{RingConfig, seq_to_index};
use crate::slot::Slot;
use basalt_shm::{Map, Segment};
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// The single producer of a broadcast ring.
///
/// Creating a `RingWriter` creates the named segment (exclusively: a
/// leftover segment from a crashed prior run must be removed with
/// [`basalt_shm::remove`] before retrying), maps it read-write and
/// placement-constructs the header and every slot. Holding the value
/// *is* the open state; there is no closed writer to misuse.
///
/// `Send` but not `Sync`: exactly one thread in one process may publish.
pub struct RingWriter<T: Copy> {
    seg: Segment,
    /// Keeps the mapping alive; all access goes through `base`.
    _map: Map,
    base: *mut u8,
    mask: u64,
    _pd: PhantomData<T>,
}

// SAFETY: the raw pointers target the mapping owned by `_map`, which
// moves with the struct; the shared-memory protocol itself is
// process-agnostic, so thread affinity is not required.
unsafe impl<T: Copy + Send> Send for RingWriter<T> {}

impl<T: Copy> RingWriter<T> {
    /// Creates the named ring segment and becomes its writer.
    ///
    /// Fails if a segment with this name already exists; single-writer
    /// per name is enforced purely by exclusive create, not by any
    /// runtime lock.
    pub fn create(name: &str, cfg: RingConfig) -> Result<Self, RingError> {
        let bytes = bytes_for_ring::<T>(cfg.capacity);
        let seg = Segment::try_create(name, bytes)?;
        let mut map = Map::of_segment(&seg)?;
        let base = map.as_mut_ptr()?;

        // SAFETY: the segment was created exclusively a moment ago, sized
        // for the header plus cfg.capacity slots; nothing else can have
        // mapped it yet.
        unsafe {
            ptr::write(
                base as *mut RingHeader,
                RingHeader {
                    magic: RING_MAGIC,
                    version: RING_VERSION,
                    capacity: cfg.capacity as u64,
                    elem_size: size_of::<T>() as u64,
                    elem_align: align_of::<T>() as u64,
                    write_seq: AtomicU64::new(0),
                },
            );
            let slots = base.add(slots_offset::<T>()) as *mut Slot<T>;
            for i in 0..cfg.capacity {
                ptr::write(slots.add(i), Slot::new());
            }
        }

        debug!(
            name = seg.name(),
            capacity = cfg.capacity,
            bytes,
            "created ring segment"
        );
        Ok(Self {
            seg,
            _map: map,
            base,
            mask: cfg.mask(),
            _pd: PhantomData,
        })
    }

    #[inline(always)]
    fn header(&self) -> &RingHeader {
        // SAFETY: base points at the header this writer constructed.
        unsafe { &*(self.base as *const RingHeader) }
    }

    #[inline(always)]
    fn slot_mut(&mut self, idx: u64) -> &mut Slot<T> {
        // SAFETY: idx is masked into capacity bounds by the caller.
        unsafe {
            let slots = self.base.add(slots_offset::<T>()) as *mut Slot<T>;
            &mut *slots.add(idx as usize)
        }
    }

    /// Publishes one element. Never blocks, never fails, unconditionally
    /// overwrites the slot regardless of consumption state.
    ///
    /// The cursor load is relaxed (this is the only mutator); the
    /// publishing store is release and happens strictly after the slot's
    /// own `write_end`, so a reader that observes the new cursor also
    /// observes the completed slot.
    #[inline(always)]
    pub fn write(&mut self, value: T) {
        let seq = self.header().write_seq.load(Ordering::Relaxed);
        let idx = seq_to_index(seq, self.mask);
        self.slot_mut(idx).write(value);
        self.header().write_seq.store(seq + 1, Ordering::Release);
    }

    pub fn capacity(&self) -> usize {
        self.header().capacity as usize
    }

    /// Count of elements published so far.
    pub fn write_seq(&self) -> u64 {
        self.header().write_seq.load(Ordering::Relaxed)
    }

    /// Normalized segment name, including the leading `/`.
    pub fn name(&self) -> &str {
        self.seg.name()
    }
}
