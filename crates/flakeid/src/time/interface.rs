use core::time::Duration;
use std::sync::Arc;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// Epoch used when a node is configured without one.
pub const DEFAULT_EPOCH: Duration = TWITTER_EPOCH;

/// A trait for time sources that return a wall-clock or monotonic timestamp.
///
/// This abstraction allows you to plug in the system clock, a monotonic
/// ticker, or a mocked time source in tests.
///
/// The unit is **milliseconds since the Unix epoch**. Generators subtract
/// their configured epoch themselves.
///
/// # Example
///
/// ```
/// use flakeid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
