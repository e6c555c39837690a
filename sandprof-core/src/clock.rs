//! Time sources for profiling sessions

use parking_lot::Mutex;
use web_time::Instant;

/// Monotonic millisecond clock
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since the clock's origin
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by a monotonic `Instant`
#[derive(Debug, Clone)]
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
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Used for replaying recorded runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Mutex::new(start_ms),
        }
    }

    /// Move the clock forward by `delta_ms`
    pub fn advance(&self, delta_ms: f64) {
        let mut now = self.now.lock();
        *now += delta_ms.max(0.0);
    }

    /// Jump to `at_ms`; the clock never runs backwards
    pub fn set(&self, at_ms: f64) {
        let mut now = self.now.lock();
        if at_ms > *now {
            *now = at_ms;
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock()
    }
}
