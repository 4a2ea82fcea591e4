use clap::ValueEnum;
use flakeid::{MonotonicClock, SystemClock, TimeSource};

/// Which time source the generators read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClockKind {
    /// The operating system wall clock. May move backward.
    System,
    /// A ticker anchored to the wall clock at startup. Never moves backward.
    Monotonic,
}

/// A time source picked at runtime.
#[derive(Clone, Debug)]
pub enum Clock {
    System(SystemClock),
    Monotonic(MonotonicClock),
}

impl Clock {
    /// Builds the clock. A monotonic clock starts its ticker thread here.
    pub fn new(kind: ClockKind) -> Self {
        match kind {
            ClockKind::System => Self::System(SystemClock),
            ClockKind::Monotonic => Self::Monotonic(MonotonicClock::new()),
        }
    }
}

impl TimeSource for Clock {
    fn current_millis(&self) -> u64 {
        match self {
            Self::System(clock) => clock.current_millis(),
            Self::Monotonic(clock) => clock.current_millis(),
        }
    }
}
