//! The observer side of a ring: opens an existing segment read-only and
//! follows the stream with a private cursor.

use crate::error::RingError;
use crate::layout::{RingHeader, bytes_for_ring, slots_offset};
use crate::ring::{ReaderConfig, Start, apply_overrun_policy, seq_to_index};
use crate::slot::Slot;
use basalt_shm::{Access, Map, Segment};
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::atomic::Ordering;
use tracing::debug;

/// One independent consumer of a broadcast ring.
///
/// Opens the named segment read-only (never creates, never constructs)
/// and casts it to the ring layout after validating the header against
/// this build's `T`. Every reader owns a private cursor and mapping; it
/// cannot affect the writer or any other reader, and the read-only
/// mapping is enforced at the OS page-protection level.
///
/// `Send` but not `Sync`: the cursor is per-consumer state.
pub struct RingReader<T: Copy> {
    seg: Segment,
    /// Keeps the mapping alive; all access goes through `base`.
    _map: Map,
    base: *const u8,
    read_seq: u64,
    mask: u64,
    /// `log2(capacity)`, for mapping a cursor to its lap.
    shift: u32,
    capacity: u64,
    overruns: u64,
    spin_limit: u32,
    _pd: PhantomData<T>,
}

// SAFETY: see `RingWriter`; the reader only ever loads from the mapping.
unsafe impl<T: Copy + Send> Send for RingReader<T> {}

impl<T: Copy> RingReader<T> {
    /// Opens the named ring with [`ReaderConfig::default`].
    pub fn open(name: &str) -> Result<Self, RingError> {
        Self::open_with(name, ReaderConfig::default())
    }

    /// Opens the named ring for reading.
    ///
    /// Fails if the segment is absent, shorter than its declared layout,
    /// or was produced by a build with a different element type or ring
    /// format (see [`crate::LayoutError`]).
    pub fn open_with(name: &str, cfg: ReaderConfig) -> Result<Self, RingError> {
        let seg = Segment::try_open(name, Access::READ_ONLY)?;
        if seg.len() < size_of::<RingHeader>() {
            return Err(RingError::Truncated {
                need: size_of::<RingHeader>(),
                have: seg.len(),
            });
        }
        let map = Map::of_segment(&seg)?;
        let base = map.as_ptr()?;

        // SAFETY: the segment is at least a header long; validate()
        // decides whether the bytes are actually ours.
        let header = unsafe { &*(base as *const RingHeader) };
        header.validate::<T>()?;

        let capacity = header.capacity;
        let need = bytes_for_ring::<T>(capacity as usize);
        if seg.len() < need {
            return Err(RingError::Truncated {
                need,
                have: seg.len(),
            });
        }

        let read_seq = match cfg.start {
            Start::Oldest => 0,
            Start::Tail => header.write_seq.load(Ordering::Acquire),
        };

        debug!(
            name = seg.name(),
            capacity,
            read_seq,
            start = ?cfg.start,
            "opened ring segment"
        );
        Ok(Self {
            seg,
            _map: map,
            base,
            read_seq,
            mask: capacity - 1,
            shift: capacity.trailing_zeros(),
            capacity,
            overruns: 0,
            spin_limit: cfg.spin_limit,
            _pd: PhantomData,
        })
    }

    #[inline(always)]
    fn header(&self) -> &RingHeader {
        // SAFETY: base points at a validated header.
        unsafe { &*(self.base as *const RingHeader) }
    }

    #[inline(always)]
    fn slot(&self, idx: u64) -> &Slot<T> {
        // SAFETY: idx is masked into capacity bounds by the caller.
        unsafe {
            let slots = self.base.add(slots_offset::<T>()) as *const Slot<T>;
            &*slots.add(idx as usize)
        }
    }

    /// Attempts to read the next element. Non-blocking.
    ///
    /// `None` means no new data: the reader is caught up, or the one
    /// slot it is due to read is mid-overwrite (torn read). The cursor
    /// only advances on success, so a failed call retries the same
    /// logical position; a reader that fell more than one lap behind is
    /// first fast-forwarded to the oldest valid element (counted in
    /// [`RingReader::overruns`]). Elements are therefore observed in
    /// chronological order, with gaps only where the writer lapped us.
    #[inline(always)]
    pub fn try_read(&mut self) -> Option<T> {
        let write_seq = self.header().write_seq.load(Ordering::Acquire);
        apply_overrun_policy(
            write_seq,
            &mut self.read_seq,
            self.capacity,
            &mut self.overruns,
        );
        if self.read_seq >= write_seq {
            return None;
        }

        let idx = seq_to_index(self.read_seq, self.mask);
        // Element `read_seq` is the (lap + 1)-th write to its slot, so a
        // matching snapshot generation proves the slot still holds it.
        let expected_gen = 2 * ((self.read_seq >> self.shift) + 1);
        let (generation, value) = self.slot(idx).read(self.spin_limit)?;
        if generation != expected_gen {
            // The writer lapped us between the cursor load and the slot
            // read; the next call fast-forwards past the gap instead of
            // delivering a newer element out of order.
            return None;
        }
        self.read_seq += 1;
        Some(value)
    }

    /// Total elements skipped because the writer lapped this reader.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Elements published and not yet consumed by this reader.
    pub fn lag(&self) -> u64 {
        self.header()
            .write_seq
            .load(Ordering::Acquire)
            .saturating_sub(self.read_seq)
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Normalized segment name, including the leading `/`.
    pub fn name(&self) -> &str {
        self.seg.name()
    }
}
