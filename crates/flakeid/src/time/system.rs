use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::TimeSource;

/// The operating system's wall clock.
///
/// Every read is a `SystemTime::now()` call, so NTP corrections and manual
/// adjustments are visible, including backward jumps. Generators stall through
/// those rather than issuing out-of-order IDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as zero, which generators treat as a
        // regression.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            })
    }
}
