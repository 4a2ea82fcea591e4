use core::{future::Future, time::Duration};

/// How an async caller waits while a generator is pending.
///
/// Implemented once per runtime so [`IdGeneratorAsyncExt`] stays
/// runtime-agnostic.
///
/// [`IdGeneratorAsyncExt`]: crate::IdGeneratorAsyncExt
pub trait SleepProvider {
    /// Suspends the current task for roughly `dur`. The future must be `Send`
    /// so callers can hold it across a multi-threaded executor.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}
