//! scoria: demo producer. Creates the basalt bus and publishes a paced
//! stream of synthetic ticks, reporting the publish rate once a second.

mod config;

use anyhow::Context;
use basalt_events::{InstrumentId, Tick};
use basalt_icc::{RingConfig, RingWriter};
use config::ScoriaConfig;
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() -> anyhow::Result<()> {
    let cfg = ScoriaConfig::load_or_default("scoria.toml").context("loading scoria.toml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    // A segment left behind by a crashed run would make the exclusive
    // create fail; the demo owns its name, so clear it up front.
    if basalt_shm::remove(&cfg.segment).context("removing stale segment")? {
        warn!(segment = %cfg.segment, "removed stale bus segment");
    }

    let mut bus = RingWriter::<Tick>::create(&cfg.segment, RingConfig::new(cfg.capacity))
        .context("creating bus")?;
    info!(
        segment = bus.name(),
        capacity = bus.capacity(),
        rate = cfg.events_per_sec,
        "publishing ticks"
    );

    // Pace in 1ms batches rather than per-event sleeps.
    let batch = (cfg.events_per_sec / 1_000).max(1);
    let batch_interval = Duration::from_millis(1);

    let mut seq: u64 = 0;
    let mut px: i64 = 100_000;
    let mut window_start = Instant::now();
    let mut window_count: u64 = 0;

    loop {
        let batch_start = Instant::now();
        for _ in 0..batch {
            px += if seq % 3 == 0 { 1 } else { -1 };
            bus.write(Tick {
                seq,
                ts_ns: now_ns(),
                instrument: InstrumentId(1),
                px_ticks: px,
                qty_lots: 10,
            });
            seq += 1;
            window_count += 1;
        }

        if window_start.elapsed() >= Duration::from_secs(1) {
            info!(
                rate = window_count,
                total = seq,
                "publish rate (ev/s)"
            );
            window_count = 0;
            window_start = Instant::now();
        }

        if let Some(rest) = batch_interval.checked_sub(batch_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}
