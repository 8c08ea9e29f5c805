//! pumice: demo consumer. Tails the basalt bus and reports consumption
//! rate and overruns once a second.

use anyhow::Context;
use basalt_events::Tick;
use basalt_icc::RingReader;
use std::time::{Duration, Instant};
use tracing::info;

const BUS_SEGMENT: &str = "/basalt_bus";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // The producer may start after us; wait for the segment to appear.
    let mut bus = loop {
        match RingReader::<Tick>::open(BUS_SEGMENT) {
            Ok(r) => break r,
            Err(e) => {
                info!(segment = BUS_SEGMENT, error = %e, "bus not ready, retrying");
                std::thread::sleep(Duration::from_millis(250));
            }
        }
    };
    bus_loop(&mut bus).context("consuming the bus")
}

fn bus_loop(bus: &mut RingReader<Tick>) -> anyhow::Result<()> {
    info!(
        segment = bus.name(),
        capacity = bus.capacity(),
        "following ticks"
    );

    let mut window_start = Instant::now();
    let mut window_count: u64 = 0;
    let mut last: Option<Tick> = None;

    loop {
        while let Some(tick) = bus.try_read() {
            window_count += 1;
            last = Some(tick);
        }

        if window_start.elapsed() >= Duration::from_secs(1) {
            info!(
                rate = window_count,
                overruns = bus.overruns(),
                lag = bus.lag(),
                last_seq = last.map(|t| t.seq),
                "consume rate (ev/s)"
            );
            window_count = 0;
            window_start = Instant::now();
        }

        std::hint::spin_loop();
    }
}
