//! Frame timing
//!
//! The application loop measures the wall-clock delta between ticks and hands
//! it to every per-frame system.

use std::time::{Duration, Instant};

/// Nominal tick rate used when the loop paces itself (60 Hz).
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Measures elapsed time between consecutive ticks.
pub struct FrameClock {
    previous: Instant,
    tick_count: u64,
    total: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
            tick_count: 0,
            total: Duration::ZERO,
        }
    }

    /// Close the current frame and return its duration.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.duration_since(self.previous);
        self.previous = now;
        self.tick_count += 1;
        self.total += delta;
        delta
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Sum of every delta returned by [`tick`](Self::tick).
    pub fn total_time(&self) -> Duration {
        self.total
    }

    /// Time left in the current frame before `TICK_DURATION` elapses.
    pub fn remaining_in_frame(&self) -> Duration {
        TICK_DURATION.saturating_sub(self.previous.elapsed())
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate() {
        let mut clock = FrameClock::new();
        std::thread::sleep(Duration::from_millis(2));
        let first = clock.tick();
        let second = clock.tick();

        assert!(first >= Duration::from_millis(2));
        assert_eq!(clock.tick_count(), 2);
        assert_eq!(clock.total_time(), first + second);
    }

    #[test]
    fn tick_duration_matches_rate() {
        let per_second = TICK_DURATION * TICK_RATE_HZ;
        assert!(per_second <= Duration::from_secs(1));
        assert!(per_second > Duration::from_millis(999));
    }
}
