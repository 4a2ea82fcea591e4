use core::{future::Future, time::Duration};

use ::smol::Timer;

use crate::{
    error::Result,
    futures::{IdGeneratorAsyncExt, SleepProvider},
    generator::IdGenerator,
    id::FlakeId,
};

/// Waits out a pending generator on a smol [`Timer`].
pub struct SmolSleep;
impl SleepProvider for SmolSleep {
    async fn sleep_for(dur: Duration) {
        Timer::after(dur).await;
    }
}

/// Yields to the smol executor instead of arming a timer.
///
/// Busy-polls through long stalls; [`SmolSleep`] is the better fit once many
/// tasks compete for the executor.
pub struct SmolYield;
impl SleepProvider for SmolYield {
    async fn sleep_for(_dur: Duration) {
        ::smol::future::yield_now().await;
    }
}

/// `generate_async` for any shareable generator on the
/// [`smol`](https://docs.rs/smol) runtime.
pub trait IdGeneratorAsyncSmolExt {
    /// Resolves to the next ID, awaiting [`SmolSleep`] on every pending poll.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`IdGenerator::try_poll_id`].
    fn generate_async(&self) -> impl Future<Output = Result<FlakeId>> + Send;
}

impl<G> IdGeneratorAsyncSmolExt for G
where
    G: IdGenerator + Sync,
{
    fn generate_async(&self) -> impl Future<Output = Result<FlakeId>> + Send {
        <Self as IdGeneratorAsyncExt>::try_next_id_async::<SmolSleep>(self)
    }
}
