use core::{future::Future, time::Duration};

use crate::{
    error::Result,
    futures::{IdGeneratorAsyncExt, SleepProvider},
    generator::IdGenerator,
    id::FlakeId,
};

/// Waits out a pending generator on Tokio's timer.
///
/// Used by [`IdGeneratorAsyncTokioExt::generate_async`].
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    async fn sleep_for(dur: Duration) {
        ::tokio::time::sleep(dur).await;
    }
}

/// Hands control back to the Tokio scheduler instead of arming a timer.
///
/// The generator is polled again as soon as the task is rescheduled, which
/// keeps latency low when few tasks compete but busy-polls through long
/// stalls such as a clock regression. Prefer [`TokioSleep`] under load.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    async fn sleep_for(_dur: Duration) {
        ::tokio::task::yield_now().await;
    }
}

/// `generate_async` for any shareable generator, sleeping on Tokio's timer
/// while the generator is pending.
///
/// ```
/// use flakeid::{IdGeneratorAsyncTokioExt, LockGenerator, MonotonicClock, NodeConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> flakeid::Result<()> {
/// let generator = LockGenerator::new(NodeConfig::new(2, 3)?, MonotonicClock::default());
/// let id = generator.generate_async().await?;
/// assert_eq!(id.worker_id(), 3);
/// # Ok(())
/// # }
/// ```
pub trait IdGeneratorAsyncTokioExt {
    /// Resolves to the next ID, awaiting [`TokioSleep`] on every pending
    /// poll.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`IdGenerator::try_poll_id`].
    fn generate_async(&self) -> impl Future<Output = Result<FlakeId>> + Send;
}

impl<G> IdGeneratorAsyncTokioExt for G
where
    G: IdGenerator + Sync,
{
    fn generate_async(&self) -> impl Future<Output = Result<FlakeId>> + Send {
        <Self as IdGeneratorAsyncExt>::try_next_id_async::<TokioSleep>(self)
    }
}
