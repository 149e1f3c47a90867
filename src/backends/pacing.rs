// SPDX-License-Identifier: GPL-3.0-only

//! Real-time pacing for frame emission

use std::thread;
use std::time::{Duration, Instant};

/// Fixed-rate clock handing out send slots
///
/// Slots are spaced by `1 / fps`. A caller that falls behind by less than one
/// interval keeps the original schedule; a caller that falls further behind
/// is resynchronised to now instead of bursting to catch up.
#[derive(Debug)]
pub struct FrameClock {
    interval: Duration,
    next_slot: Option<Instant>,
}

impl FrameClock {
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            crate::constants::video::FALLBACK_FPS
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / fps),
            next_slot: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next slot is due
    pub fn wait(&mut self) {
        let now = Instant::now();
        let slot = *self.next_slot.get_or_insert(now + self.interval);

        if slot > now {
            thread::sleep(slot - now);
            self.next_slot = Some(slot + self.interval);
        } else if now - slot < self.interval {
            self.next_slot = Some(slot + self.interval);
        } else {
            self.next_slot = Some(now + self.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_fps_falls_back() {
        let clock = FrameClock::new(0.0);
        assert_eq!(clock.interval(), Duration::from_secs_f64(1.0 / 30.0));
        let clock = FrameClock::new(f64::NAN);
        assert_eq!(clock.interval(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn test_paces_to_rate() {
        let mut clock = FrameClock::new(100.0);
        let start = Instant::now();
        for _ in 0..5 {
            clock.wait();
        }
        // 5 slots at 10ms
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_resync_after_stall() {
        let mut clock = FrameClock::new(100.0);
        clock.wait();
        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        clock.wait();
        // No sleep owed after the stall, and no burst afterwards either
        assert!(start.elapsed() < Duration::from_millis(5));
        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
