//! Monotonic time source for per-tick work slices.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin. Never decreases.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for deterministic tests and replays.
///
/// Every read moves time forward by `auto_advance`, which makes a time-sliced loop run a fixed
/// number of iterations. [`ManualClock::new`] advances 1ms per read.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Duration>,
    auto_advance: Duration,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::with_auto_advance(Duration::from_millis(1))
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_advance(auto_advance: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            auto_advance,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.auto_advance);
        now
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
