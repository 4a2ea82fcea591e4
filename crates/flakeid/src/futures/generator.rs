use core::{future::Future, time::Duration};

use super::SleepProvider;
use crate::{
    error::Result,
    generator::{IdGenerator, Poll},
    id::FlakeId,
};

/// Extension trait for asynchronously generating IDs.
///
/// This trait enables [`IdGenerator`] types to yield IDs in a `Future`-based
/// context by awaiting until the generator is ready to produce a new ID,
/// instead of blocking the thread.
///
/// The pending duration reported by the generator is handed to the chosen
/// [`SleepProvider`].
pub trait IdGeneratorAsyncExt {
    /// Returns a future that resolves to the next available ID.
    ///
    /// If the generator is not ready to issue a new ID immediately, the future
    /// will sleep for the amount of time indicated by the generator and retry.
    ///
    /// # Errors
    ///
    /// This future may return an error if the generator encounters one.
    fn try_next_id_async<S>(&self) -> impl Future<Output = Result<FlakeId>> + Send
    where
        S: SleepProvider;
}

impl<G> IdGeneratorAsyncExt for G
where
    G: IdGenerator + Sync,
{
    fn try_next_id_async<S>(&self) -> impl Future<Output = Result<FlakeId>> + Send
    where
        S: SleepProvider,
    {
        async move {
            loop {
                let dur = match self.try_poll_id()? {
                    Poll::Ready { id } => return Ok(id),
                    Poll::Pending { yield_for } => Duration::from_millis(yield_for),
                };
                S::sleep_for(dur).await;
            }
        }
    }
}
