//! Per-run clock backing `elapsed()` and `delta()`.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
    last_frame: Option<Instant>,
    last_delta: Duration,
}

impl Clock {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            last_frame: None,
            last_delta: Duration::ZERO,
        }
    }

    /// Record a host frame tick.
    pub fn tick(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            self.last_delta = now.saturating_duration_since(last);
        }
        self.last_frame = Some(now);
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Time between the two most recent ticks; zero until there have been two.
    pub fn delta(&self) -> Duration {
        self.last_delta
    }

    pub fn last_frame(&self) -> Option<Instant> {
        self.last_frame
    }

    /// Milliseconds since the run started, as scripts see it.
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_at(Instant::now()).as_secs_f32() * 1000.0
    }

    pub fn delta_ms(&self) -> f32 {
        self.last_delta.as_secs_f32() * 1000.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_zero_before_second_tick() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        assert_eq!(clock.delta(), Duration::ZERO);
        clock.tick(start + Duration::from_millis(5));
        assert_eq!(clock.delta(), Duration::ZERO);
        assert_eq!(clock.last_frame(), Some(start + Duration::from_millis(5)));
    }

    #[test]
    fn test_delta_between_ticks() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        clock.tick(start + Duration::from_millis(10));
        clock.tick(start + Duration::from_millis(26));
        assert_eq!(clock.delta(), Duration::from_millis(16));
        assert!((clock.delta_ms() - 16.0).abs() < 1e-3);
    }

    #[test]
    fn test_elapsed() {
        let start = Instant::now();
        let clock = Clock::new(start);
        assert_eq!(clock.elapsed_at(start + Duration::from_secs(2)), Duration::from_secs(2));
    }
}
