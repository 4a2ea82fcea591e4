use core::{cell::Cell, time::Duration};
use std::{
    collections::HashSet,
    rc::Rc,
    sync::{Arc, Mutex},
    thread::scope,
};

use crate::{
    AtomicGenerator, BasicGenerator, Error, FlakeId, IdGenerator, LockGenerator, MonotonicClock,
    NodeConfig, Poll, TimeSource,
};

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

#[derive(Clone)]
struct SharedMockStepTime {
    clock: Rc<MockStepTime>,
}

impl SharedMockStepTime {
    fn new(values: Vec<u64>) -> Self {
        Self {
            clock: Rc::new(MockStepTime {
                values,
                index: Cell::new(0),
            }),
        }
    }

    fn step(&self) {
        self.clock.index.set(self.clock.index.get() + 1);
    }
}

impl TimeSource for SharedMockStepTime {
    fn current_millis(&self) -> u64 {
        self.clock.values[self.clock.index.get()]
    }
}

struct MockStepTime {
    values: Vec<u64>,
    index: Cell<usize>,
}

trait PollExt {
    fn unwrap_ready(self) -> FlakeId;
    fn unwrap_pending(self) -> u64;
}

impl PollExt for Poll {
    fn unwrap_ready(self) -> FlakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

/// Timestamps equal the mock clock reading.
fn unix_node(datacenter_id: u64, worker_id: u64) -> NodeConfig {
    NodeConfig::with_epoch(datacenter_id, worker_id, Duration::ZERO).unwrap()
}

fn run_id_sequence_increments_within_same_tick<G: IdGenerator>(generator: &G) {
    let id1 = generator.try_poll_id().unwrap().unwrap_ready();
    let id2 = generator.try_poll_id().unwrap().unwrap_ready();
    let id3 = generator.try_poll_id().unwrap().unwrap_ready();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

fn run_generator_returns_pending_when_sequence_exhausted<G: IdGenerator>(generator: &G) {
    let yield_for = generator.try_poll_id().unwrap().unwrap_pending();
    assert_eq!(yield_for, 1);
}

fn run_generator_handles_rollover<G: IdGenerator>(
    generator: &G,
    shared_time: &SharedMockStepTime,
) {
    for i in 0..=FlakeId::max_sequence() {
        let id = generator.try_poll_id().unwrap().unwrap_ready();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
    }

    let yield_for = generator.try_poll_id().unwrap().unwrap_pending();
    assert_eq!(yield_for, 1);

    shared_time.step();

    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

fn run_generator_stalls_on_clock_regression<G: IdGenerator>(
    generator: &G,
    shared_time: &SharedMockStepTime,
) {
    let before = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(before.timestamp(), 42);

    // 40: two milliseconds behind, wait until strictly past 42.
    shared_time.step();
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 3);

    // 42 again: the rest of that millisecond is no longer issued.
    shared_time.step();
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);

    // 43
    shared_time.step();
    let after = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(after.timestamp(), 43);
    assert_eq!(after.sequence(), 0);
    assert!(after > before);
}

fn run_generator_rejects_exhausted_timestamp<G: IdGenerator>(generator: &G) {
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::TimestampExhausted {
            elapsed_ms: FlakeId::TIMESTAMP_MASK + 1,
            max_ms: FlakeId::TIMESTAMP_MASK,
        })
    );
}

fn run_generator_monotonic<G: IdGenerator>(generator: &G) {
    #[allow(clippy::items_after_statements)]
    const TOTAL_IDS: usize = 4096 * 256;

    let mut last_timestamp = 0;
    let mut sequence = 0;

    for _ in 0..TOTAL_IDS {
        loop {
            match generator.try_poll_id().unwrap() {
                Poll::Ready { id } => {
                    let ts = id.timestamp();
                    if ts > last_timestamp {
                        sequence = 0;
                    }

                    assert!(ts >= last_timestamp);
                    assert_eq!(id.datacenter_id(), 1);
                    assert_eq!(id.worker_id(), 1);
                    assert_eq!(id.sequence(), sequence);

                    last_timestamp = ts;
                    sequence += 1;
                    break;
                }
                Poll::Pending { .. } => {
                    core::hint::spin_loop();
                }
            }
        }
    }
}

fn run_generator_monotonic_threaded<G>(make_generator: impl Fn() -> G)
where
    G: IdGenerator + Send + Sync,
{
    const THREADS: usize = 8;
    const TOTAL_IDS: usize = 4096 * 256;
    const IDS_PER_THREAD: usize = TOTAL_IDS / THREADS;

    let generator = Arc::new(make_generator());
    let seen_ids = Arc::new(Mutex::new(HashSet::with_capacity(TOTAL_IDS)));

    scope(|s| {
        for _ in 0..THREADS {
            let generator = Arc::clone(&generator);
            let seen_ids = Arc::clone(&seen_ids);

            s.spawn(move || {
                for _ in 0..IDS_PER_THREAD {
                    loop {
                        match generator.try_poll_id().unwrap() {
                            Poll::Ready { id } => {
                                assert!(seen_ids.lock().unwrap().insert(id));
                                break;
                            }
                            Poll::Pending { .. } => std::thread::yield_now(),
                        }
                    }
                }
            });
        }
    });

    let final_count = seen_ids.lock().unwrap().len();
    assert_eq!(final_count, TOTAL_IDS, "Expected {TOTAL_IDS} unique IDs");
}

#[test]
fn basic_generator_sequence_test() {
    let generator = BasicGenerator::new(unix_node(0, 0), MockTime { millis: 42 });
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn lock_generator_sequence_test() {
    let generator = LockGenerator::new(unix_node(0, 0), MockTime { millis: 42 });
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn atomic_generator_sequence_test() {
    let generator = AtomicGenerator::new(unix_node(0, 0), MockTime { millis: 42 });
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn basic_generator_pending_test() {
    let generator = BasicGenerator::from_components(
        0,
        FlakeId::max_sequence(),
        unix_node(0, 0),
        MockTime { millis: 0 },
    );
    run_generator_returns_pending_when_sequence_exhausted(&generator);
}

#[test]
fn lock_generator_pending_test() {
    let generator = LockGenerator::from_components(
        0,
        FlakeId::max_sequence(),
        unix_node(0, 0),
        MockTime { millis: 0 },
    );
    run_generator_returns_pending_when_sequence_exhausted(&generator);
}

#[test]
fn atomic_generator_pending_test() {
    let generator = AtomicGenerator::from_components(
        0,
        FlakeId::max_sequence(),
        unix_node(0, 0),
        MockTime { millis: 0 },
    );
    run_generator_returns_pending_when_sequence_exhausted(&generator);
}

#[test]
fn fresh_generators_wait_out_the_epoch_millisecond() {
    let time = MockTime { millis: 0 };
    run_generator_returns_pending_when_sequence_exhausted(&BasicGenerator::new(
        unix_node(0, 0),
        &time,
    ));
    run_generator_returns_pending_when_sequence_exhausted(&LockGenerator::new(
        unix_node(0, 0),
        &time,
    ));
    run_generator_returns_pending_when_sequence_exhausted(&AtomicGenerator::new(
        unix_node(0, 0),
        &time,
    ));
}

#[test]
fn basic_generator_rollover_test() {
    let shared_time = SharedMockStepTime::new(vec![42, 43]);
    let generator = BasicGenerator::new(unix_node(1, 1), shared_time.clone());
    run_generator_handles_rollover(&generator, &shared_time);
}

#[test]
fn lock_generator_rollover_test() {
    let shared_time = SharedMockStepTime::new(vec![42, 43]);
    let generator = LockGenerator::new(unix_node(1, 1), shared_time.clone());
    run_generator_handles_rollover(&generator, &shared_time);
}

#[test]
fn atomic_generator_rollover_test() {
    let shared_time = SharedMockStepTime::new(vec![42, 43]);
    let generator = AtomicGenerator::new(unix_node(1, 1), shared_time.clone());
    run_generator_handles_rollover(&generator, &shared_time);
}

#[test]
fn basic_generator_clock_regression_test() {
    let shared_time = SharedMockStepTime::new(vec![42, 40, 42, 43]);
    let generator = BasicGenerator::new(unix_node(0, 0), shared_time.clone());
    run_generator_stalls_on_clock_regression(&generator, &shared_time);
}

#[test]
fn lock_generator_clock_regression_test() {
    let shared_time = SharedMockStepTime::new(vec![42, 40, 42, 43]);
    let generator = LockGenerator::new(unix_node(0, 0), shared_time.clone());
    run_generator_stalls_on_clock_regression(&generator, &shared_time);
}

#[test]
fn atomic_generator_clock_regression_test() {
    let shared_time = SharedMockStepTime::new(vec![42, 40, 42, 43]);
    let generator = AtomicGenerator::new(unix_node(0, 0), shared_time.clone());
    run_generator_stalls_on_clock_regression(&generator, &shared_time);
}

#[test]
fn generators_reject_exhausted_timestamp() {
    let time = MockTime {
        millis: FlakeId::TIMESTAMP_MASK + 1,
    };
    run_generator_rejects_exhausted_timestamp(&BasicGenerator::new(unix_node(0, 0), &time));
    run_generator_rejects_exhausted_timestamp(&LockGenerator::new(unix_node(0, 0), &time));
    run_generator_rejects_exhausted_timestamp(&AtomicGenerator::new(unix_node(0, 0), &time));
}

#[test]
fn last_representable_timestamp_is_issued() {
    let generator = BasicGenerator::new(
        unix_node(31, 31),
        MockTime {
            millis: FlakeId::TIMESTAMP_MASK,
        },
    );
    let id = generator.generate().unwrap();
    assert_eq!(id.timestamp(), FlakeId::TIMESTAMP_MASK);
    assert_eq!(id.to_raw(), FlakeId::from_parts(FlakeId::TIMESTAMP_MASK, 31, 31, 0).to_raw());
    assert!(id.to_i64() > 0);
}

#[test]
fn clock_before_epoch_saturates_to_zero() {
    let node = NodeConfig::with_epoch(0, 0, Duration::from_millis(1_000)).unwrap();
    let generator = BasicGenerator::from_components(0, 0, node, MockTime { millis: 500 });
    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 0);
    assert_eq!(id.sequence(), 1);
}

#[test]
fn known_node_and_time_decode_to_expected_fields() {
    let node = NodeConfig::new(1, 4).unwrap();
    let generator = BasicGenerator::new(
        node,
        MockTime {
            millis: node.epoch_millis() + 1_000,
        },
    );

    let id = generator.generate().unwrap();
    let decoded = generator.decode(id);

    assert_eq!(decoded.timestamp_delta(), 1_000);
    assert_eq!(decoded.timestamp(), node.epoch_millis() + 1_000);
    assert_eq!(decoded.datacenter_id(), 1);
    assert_eq!(decoded.worker_id(), 4);
    assert_eq!(decoded.sequence(), 0);
}

#[test]
fn generate_within_reports_stalled_clock() {
    let generator = LockGenerator::new(unix_node(0, 0), MockTime { millis: 0 });
    let err = generator
        .generate_within(Duration::from_millis(5))
        .unwrap_err();
    match err {
        Error::ClockStalled { waited_ms } => assert!(waited_ms >= 5),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn generate_within_returns_ready_id() {
    let generator = AtomicGenerator::new(unix_node(2, 3), MockTime { millis: 42 });
    let id = generator.generate_within(Duration::from_millis(5)).unwrap();
    assert_eq!(id, FlakeId::from_parts(42, 2, 3, 0));
}

#[test]
fn try_next_id_reports_each_wait() {
    let shared_time = SharedMockStepTime::new(vec![42, 42, 40, 43]);
    let generator = BasicGenerator::from_components(
        42,
        FlakeId::max_sequence(),
        unix_node(0, 0),
        shared_time.clone(),
    );

    let mut waits = Vec::new();
    let id = generator
        .try_next_id(|yield_for| {
            waits.push(yield_for);
            shared_time.step();
        })
        .unwrap();

    assert_eq!(waits, vec![1, 1, 3]);
    assert_eq!(id.timestamp(), 43);
}

#[test]
fn nodes_sharing_a_clock_never_collide() {
    let time = MockTime { millis: 42 };
    let a = BasicGenerator::new(unix_node(0, 1), &time);
    let b = BasicGenerator::new(unix_node(0, 2), &time);
    let c = BasicGenerator::new(unix_node(1, 1), &time);

    let mut seen = HashSet::new();
    for generator in [&a, &b, &c] {
        for _ in 0..=FlakeId::max_sequence() {
            assert!(seen.insert(generator.try_poll_id().unwrap().unwrap_ready()));
        }
    }
    assert_eq!(seen.len(), 3 * 4096);
}

#[test]
fn basic_generator_monotonic_clock_sequence_increments() {
    let generator = BasicGenerator::new(NodeConfig::new(1, 1).unwrap(), MonotonicClock::default());
    run_generator_monotonic(&generator);
}

#[test]
fn lock_generator_monotonic_clock_sequence_increments() {
    let generator = LockGenerator::new(NodeConfig::new(1, 1).unwrap(), MonotonicClock::default());
    run_generator_monotonic(&generator);
}

#[test]
fn atomic_generator_monotonic_clock_sequence_increments() {
    let generator = AtomicGenerator::new(NodeConfig::new(1, 1).unwrap(), MonotonicClock::default());
    run_generator_monotonic(&generator);
}

#[test]
fn lock_generator_threaded_monotonic() {
    let clock = MonotonicClock::default();
    run_generator_monotonic_threaded(move || {
        LockGenerator::new(NodeConfig::new(0, 0).unwrap(), clock.clone())
    });
}

#[test]
fn atomic_generator_threaded_monotonic() {
    let clock = MonotonicClock::default();
    run_generator_monotonic_threaded(move || {
        AtomicGenerator::new(NodeConfig::new(0, 0).unwrap(), clock.clone())
    });
}

#[test]
fn lock_generator_clones_share_state() {
    let generator = LockGenerator::new(unix_node(0, 0), Arc::new(MockTime { millis: 42 }));
    let clone = generator.clone();

    let a = generator.generate().unwrap();
    let b = clone.generate().unwrap();
    assert_eq!(a.sequence(), 0);
    assert_eq!(b.sequence(), 1);
}

#[cfg(feature = "tracing")]
mod events {
    use std::io;

    use tracing::Level;

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(level: Level, f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn clock_regression_is_a_warning() {
        let clock = SharedMockStepTime::new(vec![42, 40]);
        let generator = BasicGenerator::new(unix_node(0, 0), clock.clone());

        let logs = capture(Level::WARN, || {
            generator.try_poll_id().unwrap().unwrap_ready();
            clock.step();
            assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 3);
        });

        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("clock moved backward"), "{logs}");
    }

    #[test]
    fn sequence_exhaustion_is_traced() {
        let generator = BasicGenerator::from_components(
            42,
            FlakeId::max_sequence(),
            unix_node(0, 0),
            MockTime { millis: 42 },
        );

        let logs = capture(Level::TRACE, || {
            assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
        });
        assert!(logs.contains("sequence exhausted"), "{logs}");

        // Exhaustion is routine and stays below the default CLI filter.
        let logs = capture(Level::WARN, || {
            assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
        });
        assert!(logs.is_empty(), "{logs}");
    }
}
