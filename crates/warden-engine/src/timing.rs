//! Tick pacing.
//!
//! The simulation always advances in fixed steps. In realtime mode the timer
//! converts wall-clock time into a number of steps and sleeps away the rest
//! of the frame budget.

use std::time::{Duration, Instant};

/// Upper bound on catch-up steps per frame.
const MAX_STEPS_PER_FRAME: u32 = 10;

/// Largest wall-clock delta fed into the accumulator.
const MAX_FRAME_DT: f32 = 0.25;

/// Fixed-step clock.
#[derive(Debug)]
pub struct TickTimer {
    fixed_dt: f32,
    accumulator: f32,
    last_frame: Instant,
    ticks: u64,
}

impl TickTimer {
    /// Creates a timer stepping at `tick_rate` Hz.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            last_frame: Instant::now(),
            ticks: 0,
        }
    }

    /// Seconds per step.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Steps taken so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulation time after the steps taken so far.
    #[must_use]
    pub fn sim_time(&self) -> f32 {
        self.ticks as f32 * self.fixed_dt
    }

    /// Records one step taken.
    pub fn advance(&mut self) {
        self.ticks += 1;
    }

    /// Wall-clock seconds since the last call, clamped.
    pub fn frame_delta(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(MAX_FRAME_DT)
    }

    /// Adds elapsed time and returns how many steps are due.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the cap: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Sleeps until one step's worth of time has passed since the last frame.
    pub fn sleep_remainder(&self) {
        let budget = Duration::from_secs_f32(self.fixed_dt);
        let elapsed = self.last_frame.elapsed();
        if elapsed < budget {
            std::thread::sleep(budget - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_counts_steps() {
        let mut timer = TickTimer::new(10);
        assert_eq!(timer.accumulate(0.05), 0);
        assert_eq!(timer.accumulate(0.06), 1);
        assert_eq!(timer.accumulate(0.25), 2);
    }

    #[test]
    fn test_accumulate_drops_backlog() {
        let mut timer = TickTimer::new(100);
        assert_eq!(timer.accumulate(5.0), MAX_STEPS_PER_FRAME);
        assert_eq!(timer.accumulate(0.0), 0);
    }

    #[test]
    fn test_sim_time_follows_ticks() {
        let mut timer = TickTimer::new(20);
        for _ in 0..10 {
            timer.advance();
        }
        assert_eq!(timer.ticks(), 10);
        assert!((timer.sim_time() - 0.5).abs() < 1e-5);
    }
}
