use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Source of the current time for the localizer.
///
/// Measurement and purge timestamps are read from here rather than from [`Instant::now`]
/// directly, so tests and replays can control time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// The offset is stored atomically, so a single clock can be shared through an [`Arc`] between
/// the localizer and whatever drives it.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    #[must_use]
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward by `duration`, saturating instead of wrapping around.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        // the closure always returns `Some`, so this cannot fail
        let _ = self
            .offset_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |offset| {
                Some(offset.saturating_add(nanos))
            });
    }

    /// Moves the clock forward by `secs` seconds, negative or non-finite values are ignored.
    pub fn advance_secs(&self, secs: f32) {
        if let Ok(duration) = Duration::try_from_secs_f32(secs) {
            self.advance(duration);
        }
    }

    /// Time passed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::Relaxed))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));

        clock.advance_secs(0.5);
        assert_eq!(clock.elapsed(), Duration::from_millis(750));

        clock.advance_secs(-1.0);
        clock.advance_secs(f32::NAN);
        assert_eq!(clock.elapsed(), Duration::from_millis(750));
    }

    #[test]
    fn advance_saturates() {
        let clock = ManualClock::new();

        clock.advance(Duration::MAX);
        let saturated = clock.elapsed();
        assert_eq!(saturated, Duration::from_nanos(u64::MAX));

        clock.advance(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.elapsed(), saturated);
    }

    #[test]
    fn shared_clock() {
        let clock = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = clock.clone();
        let start = shared.now();

        clock.advance(Duration::from_secs(2));
        assert_eq!(shared.now() - start, Duration::from_secs(2));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
