use core::time::Duration;
use std::thread;

/// Blocks the current thread while a generator is pending.
///
/// Sub-millisecond stalls (an exhausted sequence or a lost race) only yield to
/// the scheduler, since the clock is about to tick. Longer stalls come from
/// clock regression and sleep for all but the last millisecond, then yield on
/// the next poll.
///
/// This is the strategy behind [`IdGenerator::generate`].
///
/// [`IdGenerator::generate`]: crate::IdGenerator::generate
pub fn yield_or_sleep(yield_for: u64) {
    if yield_for <= 1 {
        thread::yield_now();
    } else {
        thread::sleep(Duration::from_millis(yield_for - 1));
    }
}
