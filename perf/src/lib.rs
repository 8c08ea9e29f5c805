//! Shared helpers for the basalt benches.

use basalt_events::{InstrumentId, Tick};

/// A pid-qualified segment name so parallel bench runs never collide.
pub fn temp_bus_name(tag: &str) -> String {
    format!("/basalt_perf_{}_{}", tag, std::process::id())
}

pub fn make_tick() -> Tick {
    Tick {
        seq: 1,
        ts_ns: 1_700_000_000_000_000_000,
        instrument: InstrumentId(1),
        px_ticks: 100_000,
        qty_lots: 10,
    }
}
