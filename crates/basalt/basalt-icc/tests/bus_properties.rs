//! Behavioral properties of the broadcast ring, exercised through real
//! shared memory segments (writer and readers in one process, each with
//! its own mapping).

use basalt_icc::{
    LayoutError, ReaderConfig, RingConfig, RingError, RingReader, RingWriter, Start,
};

fn unique(tag: &str) -> String {
    format!("/basalt_icc_test_{}_{}", tag, std::process::id())
}

/// Removes the segment when the test ends, pass or fail.
struct Cleanup(String);

impl Drop for Cleanup {
    fn drop(&mut self) {
        let _ = basalt_shm::remove(&self.0);
    }
}

fn fresh(tag: &str) -> (String, Cleanup) {
    let name = unique(tag);
    let _ = basalt_shm::remove(&name);
    (name.clone(), Cleanup(name))
}

#[test]
fn round_trip_preserves_order() {
    let (name, _cleanup) = fresh("roundtrip");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(8)).expect("create");
    for v in [10, 20, 30] {
        writer.write(v);
    }

    let mut reader = RingReader::<u64>::open(&name).expect("open");
    assert_eq!(reader.try_read(), Some(10));
    assert_eq!(reader.try_read(), Some(20));
    assert_eq!(reader.try_read(), Some(30));
    assert_eq!(reader.try_read(), None);
    assert_eq!(reader.overruns(), 0);
}

#[test]
fn lapped_reader_skips_to_oldest_without_reordering() {
    let (name, _cleanup) = fresh("lossy");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(4)).expect("create");
    for v in 1..=8u64 {
        writer.write(v);
    }

    // The first lap is unrecoverable; what remains is still in order.
    let mut reader = RingReader::<u64>::open(&name).expect("open");
    let mut seen = Vec::new();
    while let Some(v) = reader.try_read() {
        seen.push(v);
    }
    assert_eq!(seen, vec![5, 6, 7, 8]);
    assert_eq!(reader.overruns(), 4);
}

#[test]
fn late_reader_observes_tail_of_history() {
    // Capacity 4, five writes: the first value is lost, the reader gets
    // the four survivors in order and then runs dry.
    let (name, _cleanup) = fresh("scenario");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(4)).expect("create");
    for v in [10, 20, 30, 40, 50] {
        writer.write(v);
    }

    let mut reader = RingReader::<u64>::open(&name).expect("open");
    assert_eq!(reader.try_read(), Some(20));
    assert_eq!(reader.try_read(), Some(30));
    assert_eq!(reader.try_read(), Some(40));
    assert_eq!(reader.try_read(), Some(50));
    assert_eq!(reader.try_read(), None);
    assert_eq!(reader.overruns(), 1);
}

#[test]
fn empty_reads_are_idempotent() {
    let (name, _cleanup) = fresh("empty");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(8)).expect("create");
    let mut reader = RingReader::<u64>::open(&name).expect("open");

    for _ in 0..1000 {
        assert_eq!(reader.try_read(), None);
    }
    assert_eq!(reader.overruns(), 0);
    assert_eq!(reader.lag(), 0);

    // The cursor did not move; the next write is still observed.
    writer.write(99);
    assert_eq!(reader.try_read(), Some(99));
    assert_eq!(reader.try_read(), None);
}

#[test]
fn readers_are_independent() {
    let (name, _cleanup) = fresh("independent");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(8)).expect("create");
    for v in [1, 2, 3] {
        writer.write(v);
    }

    let mut fast = RingReader::<u64>::open(&name).expect("open fast");
    let mut slow = RingReader::<u64>::open(&name).expect("open slow");

    // The fast reader draining does not advance the slow one.
    assert_eq!(fast.try_read(), Some(1));
    assert_eq!(fast.try_read(), Some(2));
    assert_eq!(fast.try_read(), Some(3));
    assert_eq!(fast.try_read(), None);

    assert_eq!(slow.try_read(), Some(1));

    writer.write(4);
    assert_eq!(fast.try_read(), Some(4));
    assert_eq!(slow.try_read(), Some(2));
    assert_eq!(slow.try_read(), Some(3));
    assert_eq!(slow.try_read(), Some(4));
    assert_eq!(slow.try_read(), None);
}

#[test]
fn tail_start_skips_history() {
    let (name, _cleanup) = fresh("tail");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(8)).expect("create");
    for v in [1, 2, 3] {
        writer.write(v);
    }

    let cfg = ReaderConfig {
        start: Start::Tail,
        ..ReaderConfig::default()
    };
    let mut reader = RingReader::<u64>::open_with(&name, cfg).expect("open");
    assert_eq!(reader.try_read(), None);

    writer.write(4);
    assert_eq!(reader.try_read(), Some(4));
}

#[test]
fn second_writer_is_refused_and_ring_survives() {
    let (name, _cleanup) = fresh("exclusive");
    let mut writer = RingWriter::<u64>::create(&name, RingConfig::new(8)).expect("create");
    writer.write(7);

    let rival = RingWriter::<u64>::create(&name, RingConfig::new(8));
    match rival.err().expect("exclusive create must fail") {
        RingError::Shm(err) => assert_eq!(err.os_error(), Some(libc::EEXIST)),
        other => panic!("unexpected error: {other}"),
    }

    // The losing create did not disturb the live ring.
    let mut reader = RingReader::<u64>::open(&name).expect("open");
    assert_eq!(reader.try_read(), Some(7));
}

#[test]
fn open_missing_ring_fails_without_creating() {
    let name = unique("absent");
    let _ = basalt_shm::remove(&name);

    let err = RingReader::<u64>::open(&name).err().expect("must fail");
    assert!(matches!(err, RingError::Shm(_)));
    assert!(!basalt_shm::exists(&name));
}

#[test]
fn mismatched_element_type_fails_fast() {
    let (name, _cleanup) = fresh("layout");
    let _writer = RingWriter::<u64>::create(&name, RingConfig::new(8)).expect("create");

    let err = RingReader::<u32>::open(&name)
        .err()
        .expect("layout must not validate");
    assert!(matches!(
        err,
        RingError::Layout(LayoutError::ElemSize { .. })
    ));
}

#[test]
fn events_cross_the_bus_intact() {
    use basalt_events::{InstrumentId, Tick};

    let (name, _cleanup) = fresh("events");
    let mut writer = RingWriter::<Tick>::create(&name, RingConfig::new(16)).expect("create");
    let tick = Tick {
        seq: 1,
        ts_ns: 1_700_000_000_000_000_000,
        instrument: InstrumentId(42),
        px_ticks: 10_015,
        qty_lots: 3,
    };
    writer.write(tick);

    let mut reader = RingReader::<Tick>::open(&name).expect("open");
    assert_eq!(reader.try_read(), Some(tick));
}

/// All lanes carry the same value; any torn copy breaks the equality.
#[derive(Clone, Copy, Debug)]
struct Stamp {
    a: u64,
    b: u64,
    c: u64,
    d: u64,
}

impl Stamp {
    fn of(v: u64) -> Self {
        Self { a: v, b: v, c: v, d: v }
    }
}

#[test]
fn concurrent_readers_see_consistent_monotonic_values() {
    const TOTAL: u64 = 200_000;

    let (name, _cleanup) = fresh("concurrent");
    let mut writer = RingWriter::<Stamp>::create(&name, RingConfig::new(1024)).expect("create");

    let spawn_reader = || {
        let mut reader = RingReader::<Stamp>::open(&name).expect("open");
        std::thread::spawn(move || {
            let mut last: Option<u64> = None;
            let mut reads: u64 = 0;
            let mut idle: u64 = 0;
            loop {
                match reader.try_read() {
                    Some(stamp) => {
                        idle = 0;
                        reads += 1;
                        assert!(
                            stamp.a == stamp.b && stamp.a == stamp.c && stamp.a == stamp.d,
                            "torn value escaped the seqlock: {stamp:?}"
                        );
                        if let Some(prev) = last {
                            assert!(stamp.a > prev, "values went backwards: {prev} -> {}", stamp.a);
                        }
                        last = Some(stamp.a);
                        if stamp.a == TOTAL - 1 {
                            break;
                        }
                    }
                    None => {
                        idle += 1;
                        assert!(idle < 500_000_000, "reader starved before the final value");
                        std::hint::spin_loop();
                    }
                }
            }
            (reads, reader.overruns())
        })
    };

    let r1 = spawn_reader();
    let r2 = spawn_reader();

    let producer = std::thread::spawn(move || {
        for i in 0..TOTAL {
            writer.write(Stamp::of(i));
        }
    });

    producer.join().expect("writer thread");
    let (reads1, overruns1) = r1.join().expect("reader one");
    let (reads2, overruns2) = r2.join().expect("reader two");

    // Lossy but accounted: consumed plus skipped covers the emission.
    assert!(reads1 + overruns1 <= TOTAL);
    assert!(reads2 + overruns2 <= TOTAL);
    assert!(reads1 > 0 && reads2 > 0);
}
