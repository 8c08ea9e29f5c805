//! Ring configuration and cursor arithmetic.

/// Configuration for creating a ring.
///
/// Replaces the keyword-style compile-time parameters of older designs
/// with an explicit struct: capacity is a runtime-checked argument, and
/// the storage stays fixed-size and contiguous in the segment.
#[derive(Debug, Copy, Clone)]
pub struct RingConfig {
    /// Number of slots. Must be a power of two so cursor-to-index mapping
    /// is a mask instead of a division.
    pub capacity: usize,
}

impl RingConfig {
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "ring capacity must be a power of two"
        );
        Self { capacity }
    }

    #[inline(always)]
    pub fn mask(&self) -> u64 {
        (self.capacity as u64) - 1
    }
}

impl Default for RingConfig {
    /// 65536 slots.
    fn default() -> Self {
        Self { capacity: 1 << 16 }
    }
}

/// Where a freshly opened reader starts in the stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Start {
    /// Replay from the oldest element still held in the ring.
    #[default]
    Oldest,
    /// Attach at the live edge; only elements published after the open
    /// are observed.
    Tail,
}

/// Configuration for opening a reader.
#[derive(Debug, Copy, Clone)]
pub struct ReaderConfig {
    /// Spin budget per read while a write is in flight on the target
    /// slot. The writer normally completes a slot in nanoseconds, so the
    /// budget only trips when the reader raced a write repeatedly or the
    /// writer died mid-write; either way the read reports "no data".
    pub spin_limit: u32,
    pub start: Start,
}

impl Default for ReaderConfig {
    /// 1024 spins, start at the oldest available element.
    fn default() -> Self {
        Self {
            spin_limit: 1024,
            start: Start::Oldest,
        }
    }
}

/// Maps a monotonic cursor to a slot index. Capacity is a power of two,
/// so `cursor & mask` is `cursor % capacity`.
#[inline(always)]
pub(crate) fn seq_to_index(seq: u64, mask: u64) -> u64 {
    seq & mask
}

/// Fast-forwards a lapped reader to the oldest still-valid element.
///
/// The writer never waits, so a reader more than `capacity` behind has
/// had unread slots overwritten. Jumping to `write_seq - capacity` keeps
/// every subsequent read chronologically ordered; the skipped count is
/// accumulated in `overruns`.
#[inline(always)]
pub(crate) fn apply_overrun_policy(
    write_seq: u64,
    read_seq: &mut u64,
    capacity: u64,
    overruns: &mut u64,
) {
    let behind = write_seq.saturating_sub(*read_seq);
    if behind > capacity {
        *overruns += behind - capacity;
        *read_seq = write_seq - capacity;
    }
}
