// src/utils/time.rs
//! Clocks and the fixed-rate tick used to drive games and calibration

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock, injectable for tests
pub trait TimeProvider: Send + Sync {
    /// Time elapsed since the provider was created
    fn now(&self) -> Duration;

    /// Block for `duration`
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeProvider {
    start: Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually advanced clock; sleeping advances it instantly
#[derive(Debug, Default)]
pub struct MockTimeProvider {
    current_nanos: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial: Duration) -> Self {
        Self {
            current_nanos: AtomicU64::new(initial.as_nanos() as u64),
        }
    }

    pub fn advance_by(&self, duration: Duration) {
        self.current_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn set_time(&self, time: Duration) {
        self.current_nanos
            .store(time.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.current_nanos.load(Ordering::Relaxed))
    }

    fn sleep(&self, duration: Duration) {
        self.advance_by(duration);
    }
}

impl<T: TimeProvider + ?Sized> TimeProvider for &T {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Paces a host loop at a fixed rate and reports the real time between ticks.
///
/// ```rust,no_run
/// use glove_core::utils::time::FixedRateTicker;
///
/// let mut ticker = FixedRateTicker::new(60.0);
/// for _ in 0..3 {
///     let dt = ticker.wait();
///     assert!(dt > 0.0);
/// }
/// ```
#[derive(Debug)]
pub struct FixedRateTicker<P: TimeProvider = SystemTimeProvider> {
    provider: P,
    interval: Duration,
    last: Duration,
}

impl FixedRateTicker<SystemTimeProvider> {
    pub fn new(rate_hz: f64) -> Self {
        Self::with_provider(rate_hz, SystemTimeProvider::new())
    }
}

impl<P: TimeProvider> FixedRateTicker<P> {
    /// Non-positive rates tick as fast as the host calls
    pub fn with_provider(rate_hz: f64, provider: P) -> Self {
        let interval = if rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / rate_hz)
        } else {
            Duration::ZERO
        };
        let last = provider.now();
        Self {
            provider,
            interval,
            last,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next tick is due; returns seconds since the previous one
    pub fn wait(&mut self) -> f64 {
        let elapsed = self.provider.now().saturating_sub(self.last);
        if let Some(remaining) = self.interval.checked_sub(elapsed) {
            if !remaining.is_zero() {
                self.provider.sleep(remaining);
            }
        }
        self.lap()
    }

    /// Seconds since the previous tick, without sleeping
    pub fn lap(&mut self) -> f64 {
        let now = self.provider.now();
        let dt = now.saturating_sub(self.last);
        self.last = now;
        dt.as_secs_f64()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_time_provider() {
        let clock = MockTimeProvider::new(Duration::from_millis(10));
        clock.advance_by(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(15));

        clock.set_time(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_ticker_sleeps_remaining_interval() {
        let clock = MockTimeProvider::default();
        let mut ticker = FixedRateTicker::with_provider(50.0, &clock);
        assert_eq!(ticker.interval(), Duration::from_millis(20));

        clock.advance_by(Duration::from_millis(5));
        let dt = ticker.wait();
        assert!((dt - 0.020).abs() < 1e-9);
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn test_ticker_reports_overrun() {
        let clock = MockTimeProvider::default();
        let mut ticker = FixedRateTicker::with_provider(50.0, &clock);

        clock.advance_by(Duration::from_millis(35));
        let dt = ticker.wait();
        assert!((dt - 0.035).abs() < 1e-9);
        assert_eq!(clock.now(), Duration::from_millis(35));
    }

    #[test]
    fn test_system_ticker_advances() {
        let mut ticker = FixedRateTicker::new(500.0);
        let dt = ticker.wait();
        assert!(dt >= 0.002);
    }
}
