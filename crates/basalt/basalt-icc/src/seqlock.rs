//! Sequence lock: optimistic read/write consistency for one writer and
//! many readers, without ever blocking the writer.
//!
//! # Protocol
//!
//! **Writer:**
//! 1. `write_begin()` bumps the generation to odd ("write in progress")
//! 2. mutate the protected data
//! 3. `write_end()` bumps it back to even ("stable")
//!
//! **Reader:**
//! 1. `read_begin()` snapshots an even generation, spinning past odd ones
//! 2. copy the protected data
//! 3. `read_end(snapshot)` succeeds only if the generation is unchanged
//!
//! A failed `read_end` means the copy raced a write and may be torn; the
//! caller discards it and retries later. The lock detects torn reads
//! only, never staleness: a value overwritten cleanly after the copy
//! still validates.
//!
//! The reader spin is bounded. An unbounded spin turns a writer crash
//! between `write_begin` and `write_end` into an infinite loop on every
//! reader; here the budget is an explicit parameter and exhaustion
//! reads as "no data".

use std::sync::atomic::{AtomicU64, Ordering, fence};

/// One monotonically increasing generation counter.
/// Even means quiescent, odd means a write is in flight.
#[repr(C)]
pub struct SequenceLock {
    generation: AtomicU64,
}

impl SequenceLock {
    pub const fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
        }
    }

    /// Marks a write as in progress (generation becomes odd).
    ///
    /// Single-writer only; two concurrent `write_begin` calls on the same
    /// lock corrupt the even/odd discipline.
    #[inline(always)]
    pub fn write_begin(&self) {
        self.generation.fetch_add(1, Ordering::Acquire);
    }

    /// Marks the write complete (generation becomes even again).
    ///
    /// The release pairs with the acquire in [`SequenceLock::read_begin`],
    /// so a reader that observes the new generation also observes the
    /// data written before it.
    #[inline(always)]
    pub fn write_end(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Waits for a quiescent generation and returns it as a snapshot.
    ///
    /// Spins at most `spin_limit` extra iterations while the generation
    /// is odd; `None` on exhaustion. The spin performs no syscall.
    #[inline(always)]
    pub fn read_begin(&self, spin_limit: u32) -> Option<u64> {
        let mut spins = 0;
        loop {
            let generation = self.generation.load(Ordering::Acquire);
            if generation & 1 == 0 {
                return Some(generation);
            }
            if spins >= spin_limit {
                return None;
            }
            spins += 1;
            std::hint::spin_loop();
        }
    }

    /// True when no write started since `snapshot` was taken, i.e. the
    /// copy made in between is consistent.
    #[inline(always)]
    pub fn read_end(&self, snapshot: u64) -> bool {
        fence(Ordering::Acquire);
        self.generation.load(Ordering::Relaxed) == snapshot
    }
}

impl Default for SequenceLock {
    fn default() -> Self {
        Self::new()
    }
}
