use core::cmp::Ordering;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::Result,
    generator::{
        IdGenerator, Mutex, NodeConfig, Poll, clock_behind, ensure_in_range, sequence_exhausted,
    },
    id::FlakeId,
    time::TimeSource,
};

/// A lock-based ID generator suitable for multi-threaded environments.
///
/// This generator wraps its state in an [`Arc<Mutex<_>>`], allowing safe
/// shared use across threads. Cloning the generator shares the same state, so
/// every clone continues the same sequence.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ The clock is read while the lock is held, so callers are serialized in
///   clock order
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - Fair access across threads is important
/// - Your target doesn't support 64-bit atomics
///
/// ## See Also
/// - [`BasicGenerator`]
/// - [`AtomicGenerator`]
///
/// [`BasicGenerator`]: crate::BasicGenerator
/// [`AtomicGenerator`]: crate::AtomicGenerator
pub struct LockGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<FlakeId>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<FlakeId>>,
    node: NodeConfig,
    time: T,
}

impl<T> LockGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`LockGenerator`] with empty prior state.
    ///
    /// # Example
    /// ```
    /// use std::thread;
    ///
    /// use flakeid::{LockGenerator, MonotonicClock, NodeConfig};
    ///
    /// let generator = LockGenerator::new(NodeConfig::new(0, 7).unwrap(), MonotonicClock::default());
    ///
    /// let handles: Vec<_> = (0..4)
    ///     .map(|_| {
    ///         let generator = generator.clone();
    ///         thread::spawn(move || generator.generate().unwrap())
    ///     })
    ///     .collect();
    ///
    /// for handle in handles {
    ///     assert_eq!(handle.join().unwrap().worker_id(), 7);
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
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(state))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(state)),
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
    /// - [`Error::TimestampExhausted`] once the 41-bit timestamp range is used
    ///   up.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    ///
    /// [`Error::TimestampExhausted`]: crate::Error::TimestampExhausted
    /// [`Error::LockPoisoned`]: crate::Error
    pub fn generate(&self) -> Result<FlakeId> {
        <Self as IdGenerator>::generate(self)
    }

    /// Attempts to generate the next available ID.
    ///
    /// Returns [`Poll::Ready`] with a new ID, or [`Poll::Pending`] with the
    /// suggested wait when the sequence is used up or the clock is behind.
    ///
    /// # Errors
    ///
    /// - [`Error::TimestampExhausted`] once the 41-bit timestamp range is used
    ///   up.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    ///
    /// # Example
    /// ```
    /// use flakeid::{LockGenerator, NodeConfig, Poll, SystemClock};
    ///
    /// let generator = LockGenerator::new(NodeConfig::new(2, 3).unwrap(), SystemClock);
    ///
    /// let id = loop {
    ///     match generator.try_poll_id() {
    ///         Ok(Poll::Ready { id }) => break id,
    ///         Ok(Poll::Pending { yield_for }) => {
    ///             std::thread::sleep(core::time::Duration::from_millis(yield_for));
    ///         }
    ///         Err(e) => panic!("Generator error: {}", e),
    ///     }
    /// };
    /// assert_eq!(id.datacenter_id(), 2);
    /// ```
    ///
    /// [`Error::TimestampExhausted`]: crate::Error::TimestampExhausted
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        let now = self.node.elapsed(self.time.current_millis());
        let current_ts = state.timestamp();

        match now.cmp(&current_ts) {
            Ordering::Equal => {
                if state.has_sequence_room() {
                    *state = state.increment_sequence();
                    Ok(Poll::Ready { id: *state })
                } else {
                    Ok(sequence_exhausted(current_ts))
                }
            }
            Ordering::Greater => {
                ensure_in_range(now)?;
                *state = state.rollover_to_timestamp(now);
                Ok(Poll::Ready { id: *state })
            }
            Ordering::Less => {
                *state = state.exhaust_sequence();
                Ok(clock_behind(now, current_ts))
            }
        }
    }
}

impl<T> Clone for LockGenerator<T>
where
    T: TimeSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            node: self.node,
            time: self.time.clone(),
        }
    }
}

impl<T> IdGenerator for LockGenerator<T>
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
