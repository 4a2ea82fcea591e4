use core::{cell::Cell, cmp::Ordering};

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

/// A non-concurrent ID generator suitable for single-owner use.
///
/// This generator is lightweight and fast, but **not thread-safe**: it is
/// `Send` but not `Sync`. The generator service moves one into a single task
/// that owns it exclusively.
///
/// ## Features
/// - ❌ Not thread-safe
/// - ✅ No locking or atomics on the hot path
///
/// ## Recommended When
/// - You're in a single-threaded environment (no shared access)
/// - One task or thread owns the generator and serves requests for others
///
/// ## See Also
/// - [`LockGenerator`]
/// - [`AtomicGenerator`]
///
/// [`LockGenerator`]: crate::LockGenerator
/// [`AtomicGenerator`]: crate::AtomicGenerator
pub struct BasicGenerator<T>
where
    T: TimeSource,
{
    state: Cell<FlakeId>,
    node: NodeConfig,
    time: T,
}

impl<T> BasicGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`BasicGenerator`] with empty prior state.
    ///
    /// # Example
    /// ```
    /// use flakeid::{BasicGenerator, NodeConfig, SystemClock};
    ///
    /// let generator = BasicGenerator::new(NodeConfig::new(1, 4).unwrap(), SystemClock);
    ///
    /// let id = generator.generate().unwrap();
    /// assert_eq!(id.datacenter_id(), 1);
    /// assert_eq!(id.worker_id(), 4);
    /// ```
    pub fn new(node: NodeConfig, time: T) -> Self {
        Self::from_state(node.initial_state(), node, time)
    }

    /// Creates a generator that resumes after the given last timestamp and
    /// sequence.
    ///
    /// This constructor is primarily useful for tests and for controlling the
    /// starting point of the generator manually. In typical use cases, you
    /// should prefer [`Self::new`].
    pub fn from_components(timestamp: u64, sequence: u64, node: NodeConfig, time: T) -> Self {
        Self::from_state(node.pack(timestamp, sequence), node, time)
    }

    fn from_state(state: FlakeId, node: NodeConfig, time: T) -> Self {
        Self {
            state: Cell::new(state),
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
    /// This method attempts to generate the next ID based on the current time
    /// and internal state. If successful, it returns [`Poll::Ready`] with a
    /// newly generated ID. If the sequence for this millisecond is used up,
    /// or the clock is behind the last issued timestamp, it returns
    /// [`Poll::Pending`].
    ///
    /// # Returns
    /// - `Ok(Poll::Ready { id })`: A new ID is available
    /// - `Ok(Poll::Pending { yield_for })`: The time to wait (in milliseconds)
    ///   before trying again
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampExhausted`] once the 41-bit timestamp range
    /// is used up.
    ///
    /// [`Error::TimestampExhausted`]: crate::Error::TimestampExhausted
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let now = self.node.elapsed(self.time.current_millis());
        let state = self.state.get();
        let current_ts = state.timestamp();

        match now.cmp(&current_ts) {
            Ordering::Equal => {
                if state.has_sequence_room() {
                    let updated = state.increment_sequence();
                    self.state.set(updated);
                    Ok(Poll::Ready { id: updated })
                } else {
                    Ok(sequence_exhausted(current_ts))
                }
            }
            Ordering::Greater => {
                ensure_in_range(now)?;
                let updated = state.rollover_to_timestamp(now);
                self.state.set(updated);
                Ok(Poll::Ready { id: updated })
            }
            Ordering::Less => {
                // Nothing more is issued for `current_ts`, so the generator
                // resumes strictly after it.
                self.state.set(state.exhaust_sequence());
                Ok(clock_behind(now, current_ts))
            }
        }
    }
}

impl<T> IdGenerator for BasicGenerator<T>
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
