use core::cmp;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::Result,
    generator::{
        IdGenerator, NodeConfig, Poll, clock_behind, ensure_in_range, sequence_exhausted,
    },
    id::FlakeId,
    time::TimeSource,
};

/// A lock-free ID generator suitable for multi-threaded environments.
///
/// This generator stores its packed state in an [`AtomicU64`] and advances it
/// with a single compare-and-swap, allowing safe shared use across threads.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Lock-free
///
/// ## Caveats
/// A caller that loses the race gets [`Poll::Pending`] with `yield_for == 0`
/// and should retry immediately. Under heavy contention this can spin more
/// than [`LockGenerator`].
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - You want the lowest possible latency under light-to-moderate contention
///
/// ## See Also
/// - [`BasicGenerator`]
/// - [`LockGenerator`]
///
/// [`BasicGenerator`]: crate::BasicGenerator
/// [`LockGenerator`]: crate::LockGenerator
pub struct AtomicGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    node: NodeConfig,
    time: T,
}

impl<T> AtomicGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`AtomicGenerator`] with empty prior state.
    ///
    /// # Example
    /// ```
    /// use std::{sync::Arc, thread};
    ///
    /// use flakeid::{AtomicGenerator, MonotonicClock, NodeConfig};
    ///
    /// let generator = Arc::new(AtomicGenerator::new(
    ///     NodeConfig::new(5, 9).unwrap(),
    ///     MonotonicClock::default(),
    /// ));
    ///
    /// let handles: Vec<_> = (0..4)
    ///     .map(|_| {
    ///         let generator = Arc::clone(&generator);
    ///         thread::spawn(move || generator.generate().unwrap())
    ///     })
    ///     .collect();
    ///
    /// for handle in handles {
    ///     assert_eq!(handle.join().unwrap().datacenter_id(), 5);
    /// }
    /// ```
    pub fn new(node: NodeConfig, time: T) -> Self {
        Self::from_state(node.initial_state(), node, time)
    }

    /// Creates a generator that resumes after the given last timestamp and
    /// sequence.
    ///
    /// In typical use cases, you should prefer [`Self::new`].
    pub fn from_components(timestamp: u64, sequence: u64, node: NodeConfig, time: T) -> Self {
        Self::from_state(node.pack(timestamp, sequence), node, time)
    }

    fn from_state(state: FlakeId, node: NodeConfig, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(state.to_raw())),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(state.to_raw()),
            node,
            time,
        }
    }

    /// The node this generator issues IDs for.
    pub const fn node(&self) -> &NodeConfig {
        &self.node
    }

    /// Generates a new ID, blocking until the clock allows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampExhausted`] once the 41-bit timestamp range
    /// is used up.
    ///
    /// [`Error::TimestampExhausted`]: crate::Error::TimestampExhausted
    pub fn generate(&self) -> Result<FlakeId> {
        <Self as IdGenerator>::generate(self)
    }

    /// Attempts to generate the next available ID.
    ///
    /// Returns [`Poll::Ready`] with a new ID, or [`Poll::Pending`] when the
    /// sequence is used up, the clock is behind, or another thread won the
    /// race (`yield_for == 0`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampExhausted`] once the 41-bit timestamp range
    /// is used up.
    ///
    /// [`Error::TimestampExhausted`]: crate::Error::TimestampExhausted
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        // Load before reading the clock: a state published by a faster thread
        // must not look like a regression.
        let current_raw = self.state.load(Ordering::Acquire);
        let current = FlakeId::from_raw(current_raw);
        let current_ts = current.timestamp();

        let now = self.node.elapsed(self.time.current_millis());

        let next = match now.cmp(&current_ts) {
            cmp::Ordering::Equal => {
                if current.has_sequence_room() {
                    current.increment_sequence()
                } else {
                    return Ok(sequence_exhausted(current_ts));
                }
            }
            cmp::Ordering::Greater => {
                ensure_in_range(now)?;
                current.rollover_to_timestamp(now)
            }
            cmp::Ordering::Less => {
                // A lost race here means someone else already moved the state
                // on, which is just as good.
                let _ = self.state.compare_exchange(
                    current_raw,
                    current.exhaust_sequence().to_raw(),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                );
                return Ok(clock_behind(now, current_ts));
            }
        };

        if self
            .state
            .compare_exchange(current_raw, next.to_raw(), Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            Ok(Poll::Ready { id: next })
        } else {
            // CAS failed - another thread won the race. Yield 0 to retry
            // immediately.
            Ok(Poll::Pending { yield_for: 0 })
        }
    }
}

impl<T> IdGenerator for AtomicGenerator<T>
where
    T: TimeSource,
{
    fn node(&self) -> &NodeConfig {
        &self.node
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}
