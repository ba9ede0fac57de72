use std::time::{Duration, Instant};

/// Wall-clock progress through one transition phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseClock {
    start: Instant,
    duration: Duration,
}

impl PhaseClock {
    pub fn new(start: Instant, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// A clock that already reads `progress` at `now`.
    pub fn resumed(now: Instant, duration: Duration, progress: f32) -> Self {
        let offset = duration.mul_f32(progress.clamp(0.0, 1.0));
        Self {
            start: now.checked_sub(offset).unwrap_or(now),
            duration,
        }
    }

    /// Linear progress in `[0, 1]`. Zero-length phases are always complete.
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_linear_progress() {
        let start = Instant::now();
        let clock = PhaseClock::new(start, Duration::from_millis(200));
        assert_eq!(clock.progress(start), 0.0);
        assert!((clock.progress(start + Duration::from_millis(50)) - 0.25).abs() < 1e-6);
        assert_eq!(clock.progress(start + Duration::from_millis(200)), 1.0);
        assert_eq!(clock.progress(start + Duration::from_secs(5)), 1.0);
    }

    #[test]
    fn zero_duration_is_complete_immediately() {
        let start = Instant::now();
        let clock = PhaseClock::new(start, Duration::ZERO);
        assert_eq!(clock.progress(start), 1.0);
    }

    #[test]
    fn resumed_clock_starts_mid_phase() {
        let now = Instant::now() + Duration::from_secs(1);
        let clock = PhaseClock::resumed(now, Duration::from_millis(400), 0.25);
        assert!((clock.progress(now) - 0.25).abs() < 1e-4);
    }
}
