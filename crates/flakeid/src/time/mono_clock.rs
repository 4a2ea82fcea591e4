use core::time::Duration;
use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crate::time::TimeSource;

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A monotonic time source anchored to the wall clock at construction.
///
/// This avoids wall-clock adjustments (e.g., NTP or daylight savings changes)
/// while still reporting milliseconds since the Unix epoch, so IDs decode to
/// real dates.
///
/// Internally, the clock spawns a background thread that updates a shared
/// atomic counter once per millisecond, using a monotonic timer (`Instant`) to
/// measure elapsed time since construction. Reads add that counter to the
/// wall-clock offset captured at startup. Clones share the same ticker, and
/// the thread exits once the last clone is dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    unix_offset: u64, // in milliseconds
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a new ticker anchored to the current wall-clock time.
    ///
    /// A wall clock set before 1970 anchors the ticker at zero.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use flakeid::{MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::new();
    /// let before = clock.current_millis();
    ///
    /// std::thread::sleep(Duration::from_millis(5));
    ///
    /// // The value never goes backward. Timer alignment means the counter may
    /// // trail the sleep slightly.
    /// assert!(clock.current_millis() >= before);
    /// ```
    pub fn new() -> Self {
        let start = Instant::now();
        let unix_offset = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            });

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Compute the absolute target time of the next tick
                let target = start + Duration::from_millis(tick);

                // Sleep if we are early
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                // After waking, recompute how far we actually are from the
                // start
                let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                // Monotonic store, aligned to elapsed milliseconds since start
                inner_ref.current.store(now_ms, Ordering::Relaxed);

                // Align to next tick after the current actual time
                tick = now_ms + 1;
            }
        });

        // The cell was created above and is set exactly once.
        let _ = inner._handle.set(handle);

        Self { inner, unix_offset }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the Unix epoch, based on the
    /// elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        self.unix_offset + self.inner.current.load(Ordering::Relaxed)
    }
}
