//! Event types carried over the basalt bus.
//!
//! Everything here is plain old data: fixed layout, `Copy`, no embedded
//! pointers or ownership, so a value can be copied bitwise across process
//! boundaries (and mid-mutation, where the seqlock discards the copy).

#![forbid(unsafe_code)]

/// Stable cross-process instrument identifier.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InstrumentId(pub u32);

/// One priced tick, the demo payload of the bus.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Producer-assigned sequence number, strictly increasing.
    pub seq: u64,
    /// Emission timestamp, nanoseconds since the Unix epoch.
    pub ts_ns: u64,
    pub instrument: InstrumentId,
    /// Price in ticks (price divided by the instrument's tick size).
    pub px_ticks: i64,
    /// Quantity in lots.
    pub qty_lots: i64,
}
