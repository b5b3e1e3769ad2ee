//! Monotonic millisecond clock and fixed-period ticking
//!
//! Every time-gated decision in the crate (modem timeouts, link recovery
//! intervals, peer staleness) reads time through [`Clock`], so tests can
//! drive hours of link behaviour with a [`ManualClock`] in microseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic millisecond time source
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds
    fn sleep_ms(&self, ms: u64);
}

/// Wall-clock backed implementation using [`Instant`]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Manually advanced clock for tests
///
/// `sleep_ms` returns immediately after advancing the clock, so blocking
/// waits (modem timeouts, reset settle delays) cost no real time.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Move time forward
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

/// Sleep-until-next-tick scheduler for the periodic loops
///
/// Deadlines advance by exactly one period so the loop rate does not drift
/// with the work done inside a tick. After an overrun (a blocking modem
/// exchange, for instance) the schedule restarts from the current time
/// instead of bursting to catch up.
pub struct Ticker {
    period_ms: u64,
    next_ms: u64,
}

impl Ticker {
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_ms: now_ms + period_ms,
        }
    }

    /// Build a ticker from a loop rate in Hz
    pub fn from_rate_hz(rate_hz: u32, now_ms: u64) -> Self {
        Self::new(1000 / u64::from(rate_hz.max(1)), now_ms)
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Block until the next deadline
    ///
    /// Returns `true` if the previous tick overran its period.
    pub fn wait(&mut self, clock: &dyn Clock) -> bool {
        let now = clock.now_ms();
        if now >= self.next_ms {
            let missed = now > self.next_ms;
            self.next_ms = now + self.period_ms;
            return missed;
        }
        clock.sleep_ms(self.next_ms - now);
        self.next_ms += self.period_ms;
        false
    }
}
