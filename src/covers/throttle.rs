//! Fixed-interval rate limiter for title-fallback lookups.
//!
//! Replaces per-iteration sleeps with a minimum interval between calls,
//! shared by all enrichment workers. This is a courtesy throttle for the
//! search endpoints; ISBN lookups and cache hits bypass it entirely.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// A throttle that never pauses.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Block the calling worker until at least `min_interval` has elapsed
    /// since the previous `pause` across all workers.
    pub fn pause(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}
