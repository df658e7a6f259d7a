//! Injectable clock: monotonic time for windows and debounces, wall time
//! for stamps written into records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn wall(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when told to. Clones share one time source.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: (Instant, DateTime<Utc>),
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Clock whose wall time starts at `wall`.
    pub fn at(wall: DateTime<Utc>) -> Self {
        let start = Instant::now();
        Self { origin: (start, wall), now: Arc::new(Mutex::new(start)) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn wall(&self) -> DateTime<Utc> {
        let elapsed = self.now().saturating_duration_since(self.origin.0);
        self.origin.1 + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_millis(500));
        assert_eq!(clock.now() - start, Duration::from_millis(500));
    }

    #[test]
    fn test_manual_wall_time_follows_advance() {
        let start = Utc.with_ymd_and_hms(2026, 4, 5, 9, 0, 0).unwrap();
        let clock = ManualClock::at(start);
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.wall(), Utc.with_ymd_and_hms(2026, 4, 5, 9, 1, 30).unwrap());
    }
}
