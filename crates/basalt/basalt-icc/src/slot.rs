//! One ring slot: a payload guarded by a sequence lock.

use crate::seqlock::SequenceLock;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

/// A seqlock-protected payload cell, constructed in place inside shared
/// memory and never separately allocated.
///
/// # Memory layout
///
/// `#[repr(C)]`: generation counter, validity flag, payload. This is the
/// exact byte layout readers in other processes cast to, so `T` must be
/// `Copy` with a fixed layout and no embedded pointers or ownership; it
/// is copied bitwise, possibly mid-mutation, and the copy is discarded
/// whenever the generation check fails.
#[repr(C)]
pub struct Slot<T: Copy> {
    lock: SequenceLock,
    /// Nonzero once the slot has been written at least once.
    valid: AtomicU32,
    data: MaybeUninit<T>,
}

impl<T: Copy> Slot<T> {
    pub const fn new() -> Self {
        Self {
            lock: SequenceLock::new(),
            valid: AtomicU32::new(0),
            data: MaybeUninit::uninit(),
        }
    }

    /// Stores `value`, unconditionally overwriting the previous payload.
    ///
    /// Always succeeds; there is no backpressure. Exclusive access is the
    /// ring's single-writer guarantee, not enforced here.
    #[inline(always)]
    pub fn write(&mut self, value: T) {
        self.lock.write_begin();
        self.data.write(value);
        self.valid.store(1, Ordering::Relaxed);
        self.lock.write_end();
    }

    /// Copies out the payload if a consistent snapshot can be taken,
    /// together with the generation it was taken at. The generation is
    /// `2 * n` after the n-th complete write, which lets a caller that
    /// reuses slots tell which write it actually observed.
    ///
    /// `None` when the slot was never written, when a write was still in
    /// flight after `spin_limit` spins, or when the copy raced a write
    /// (torn read). A torn read is indistinguishable from "no data": the
    /// corrective action is the same, retry later. A mixed old/new value
    /// is never returned.
    #[inline(always)]
    pub fn read(&self, spin_limit: u32) -> Option<(u64, T)> {
        if self.valid.load(Ordering::Relaxed) == 0 {
            return None;
        }
        let snapshot = self.lock.read_begin(spin_limit)?;
        if snapshot == 0 {
            // The validity store is visible but the first write_end is
            // not yet; the payload bytes may not be either.
            return None;
        }
        // SAFETY: a nonzero even generation means at least one complete
        // write is visible, so the bytes are initialized. Consistency of
        // the copy is validated below; an inconsistent copy never escapes.
        let value = unsafe { self.data.as_ptr().read() };
        if self.lock.read_end(snapshot) {
            Some((snapshot, value))
        } else {
            None
        }
    }
}

impl<T: Copy> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}
