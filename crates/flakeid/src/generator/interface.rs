use core::time::Duration;
use std::time::Instant;

use crate::{
    error::{Error, Result},
    generator::{NodeConfig, Poll, yield_or_sleep},
    id::{DecodedId, FlakeId},
};

/// A minimal interface for generating IDs.
///
/// Implementors provide [`IdGenerator::try_poll_id`], a single non-blocking
/// attempt executed atomically with respect to other callers of the same
/// instance. The blocking operations are built on top of it.
pub trait IdGenerator {
    /// The node this generator issues IDs for.
    fn node(&self) -> &NodeConfig;

    /// Attempts to generate the next available ID.
    ///
    /// The returned [`Poll`] contains either:
    /// - the newly generated ID, or
    /// - a duration to yield/sleep if the sequence is exhausted or the clock
    ///   is behind.
    ///
    /// # Errors
    ///
    /// - [`Error::TimestampExhausted`] once the 41-bit timestamp range is used
    ///   up.
    /// - [`Error::LockPoisoned`] if a lock-based implementation is poisoned.
    fn try_poll_id(&self) -> Result<Poll>;

    /// Generates the next ID, calling `f` with the suggested wait (in
    /// milliseconds) each time the generator is pending.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`IdGenerator::try_poll_id`].
    fn try_next_id(&self, mut f: impl FnMut(u64)) -> Result<FlakeId>
    where
        Self: Sized,
    {
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => f(yield_for),
            }
        }
    }

    /// Generates the next ID, blocking the current thread until the clock
    /// allows it.
    ///
    /// The wait is unbounded: a clock that regressed by a second stalls the
    /// caller for about a second. See [`IdGenerator::generate_within`] for a
    /// bounded variant.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`IdGenerator::try_poll_id`].
    fn generate(&self) -> Result<FlakeId>
    where
        Self: Sized,
    {
        self.try_next_id(yield_or_sleep)
    }

    /// Generates the next ID, giving up after `max_wait`.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockStalled`] if the generator is still pending after
    ///   `max_wait`.
    /// - Any error from [`IdGenerator::try_poll_id`].
    fn generate_within(&self, max_wait: Duration) -> Result<FlakeId>
    where
        Self: Sized,
    {
        let start = Instant::now();
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => {
                    let waited = start.elapsed();
                    if waited >= max_wait {
                        return Err(Error::ClockStalled {
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    let remaining = max_wait - waited;
                    let capped = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
                    yield_or_sleep(yield_for.min(capped.max(1)));
                }
            }
        }
    }

    /// Decodes an ID issued by this generator, using its epoch.
    fn decode(&self, id: FlakeId) -> DecodedId {
        id.decode(self.node().epoch())
    }
}

/// Rejects a timestamp delta that no longer fits the 41-bit field.
pub(crate) fn ensure_in_range(now: u64) -> Result<()> {
    if now > FlakeId::TIMESTAMP_MASK {
        return Err(Error::TimestampExhausted {
            elapsed_ms: now,
            max_ms: FlakeId::TIMESTAMP_MASK,
        });
    }
    Ok(())
}

/// The clock reads earlier than the last issued timestamp. Waits until it is
/// strictly past it.
#[cold]
#[inline(never)]
pub(crate) fn clock_behind(now: u64, current_ts: u64) -> Poll {
    debug_assert!(current_ts > now);
    let yield_for = current_ts - now + 1;
    #[cfg(feature = "tracing")]
    tracing::warn!(now, last_timestamp = current_ts, yield_for, "clock moved backward");
    Poll::Pending { yield_for }
}

/// All 4096 sequence values for `timestamp` are issued. Waits for the next
/// millisecond.
#[inline]
pub(crate) fn sequence_exhausted(_timestamp: u64) -> Poll {
    #[cfg(feature = "tracing")]
    tracing::trace!(timestamp = _timestamp, "sequence exhausted");
    Poll::Pending { yield_for: 1 }
}
