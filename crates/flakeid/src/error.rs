/// A result type defaulting to the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `flakeid` can emit.
///
/// Clock regression and per-millisecond sequence exhaustion are **not**
/// errors: generators stall until the clock moves past the last issued
/// timestamp. Errors are limited to bad node configuration, the opt-in bounded
/// wait, exhaustion of the 41-bit timestamp range, lock poisoning, and the
/// lifecycle of the generator service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A node identifier does not fit its bit field.
    ///
    /// Raised only at construction; no generator is created.
    #[error("invalid configuration: {field} = {value} (max {max})")]
    InvalidConfiguration {
        /// Name of the offending field (`datacenter_id` or `worker_id`).
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// The largest accepted value.
        max: u64,
    },

    /// The clock did not move past the last issued timestamp within the
    /// caller's maximum wait.
    ///
    /// Only returned by [`IdGenerator::generate_within`].
    ///
    /// [`IdGenerator::generate_within`]: crate::IdGenerator::generate_within
    #[error("clock did not advance within {waited_ms} ms")]
    ClockStalled {
        /// How long the caller waited before giving up.
        waited_ms: u64,
    },

    /// The elapsed time since the epoch no longer fits the 41-bit timestamp
    /// field.
    #[error("timestamp range exhausted: {elapsed_ms} ms since epoch exceeds {max_ms} ms")]
    TimestampExhausted {
        /// Milliseconds elapsed since the configured epoch.
        elapsed_ms: u64,
        /// Largest representable timestamp delta.
        max_ms: u64,
    },

    /// The operation failed because the generator lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,

    /// The generator service has been shut down and refuses new work.
    #[error("generator service is shut down")]
    ServiceShutdown,

    /// The channel to or from the generator service closed unexpectedly.
    #[error("channel closed: {context}")]
    ChannelClosed {
        /// Which side of the exchange failed.
        context: String,
    },

    /// A batch request asked for more IDs than the service hands out at once.
    #[error("batch of {requested} ids exceeds the maximum of {max}")]
    InvalidBatchSize {
        /// Number of IDs requested.
        requested: usize,
        /// Largest accepted batch.
        max: usize,
    },
}

#[cfg(not(feature = "parking-lot"))]
use std::sync::{MutexGuard, PoisonError};

// Convert all poisoned lock errors to a simplified `LockPoisoned`
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
