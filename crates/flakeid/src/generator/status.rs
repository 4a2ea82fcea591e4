use crate::id::FlakeId;

/// Represents the result of a single attempt to generate an ID.
///
/// - [`Poll::Ready`] indicates a new ID was successfully generated.
/// - [`Poll::Pending`] means the generator cannot issue an ID yet: the
///   sequence for the current millisecond is used up, the clock is behind the
///   last issued timestamp, or (for the atomic generator) another thread won
///   the race.
///
/// This allows non-blocking generation loops and clean backoff strategies.
///
/// # Example
///
/// ```
/// use flakeid::{BasicGenerator, NodeConfig, Poll, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_288_834_975_657
///     }
/// }
///
/// let generator = BasicGenerator::new(NodeConfig::new(1, 4).unwrap(), FixedTime);
/// match generator.try_poll_id().unwrap() {
///     Poll::Ready { id } => assert_eq!(id.timestamp(), 1000),
///     Poll::Pending { yield_for } => println!("Back off for {yield_for} ms"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: FlakeId,
    },
    /// No ID could be generated yet.
    ///
    /// Wait roughly `yield_for` milliseconds before polling again. Zero means
    /// retry immediately.
    Pending {
        /// Milliseconds until the clock is expected to pass the last issued
        /// timestamp.
        yield_for: u64,
    },
}
