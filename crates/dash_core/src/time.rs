//! Tick pacing and the millisecond game clock.
//!
//! The game runs exactly one simulation step per tick at a fixed target rate.
//! When a tick finishes early the loop waits out the rest of the budget;
//! a slow tick is never caught up, so simulation speed follows the tick
//! cadence rather than wall-clock time.

use std::time::{Duration, Instant};

const FPS_SAMPLE_COUNT: usize = 60;
const SLOW_TICK_WARN_SECS: f64 = 0.25;

pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

pub struct TimeState {
    pub tick_budget: Duration,
    pub tick_count: u64,
    pub real_dt: f64,
    start_instant: Instant,
    last_instant: Instant,
    tick_start: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl TimeState {
    pub fn new(tick_rate_hz: u32) -> Self {
        let hz = tick_rate_hz.max(1);
        let now = Instant::now();
        let nominal_dt = 1.0 / hz as f64;
        Self {
            tick_budget: Duration::from_millis(1000 / hz as u64),
            tick_count: 0,
            real_dt: 0.0,
            start_instant: now,
            last_instant: now,
            tick_start: now,
            fps_samples: [nominal_dt; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: hz as f64,
            smoothed_frame_time_ms: nominal_dt * 1000.0,
        }
    }

    /// Monotonic milliseconds since startup. This is the clock used for
    /// collectible spawn and timeout timestamps.
    pub fn now_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }

    pub fn begin_tick(&mut self) {
        let now = Instant::now();
        self.real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.tick_start = now;
        self.tick_count += 1;

        if self.real_dt > SLOW_TICK_WARN_SECS {
            log::warn!(
                "Tick took {:.1}ms, simulation is running behind wall clock",
                self.real_dt * 1000.0
            );
        }

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    /// Earliest instant the next tick may start.
    pub fn next_tick_deadline(&self) -> Instant {
        self.tick_start + self.tick_budget
    }

    /// How long the loop still has to wait before the next tick.
    pub fn remaining_budget(&self) -> Option<Duration> {
        remaining_budget(self.tick_start.elapsed(), self.tick_budget)
    }

    /// True once the current budget is spent. Redraws that arrive earlier
    /// (expose, resize) re-render the last state without stepping.
    pub fn tick_due(&self) -> bool {
        tick_due(self.tick_start.elapsed(), self.tick_budget)
    }
}

/// Time left in a tick budget after `elapsed`; `None` once the budget is spent.
pub fn remaining_budget(elapsed: Duration, budget: Duration) -> Option<Duration> {
    budget.checked_sub(elapsed).filter(|left| !left.is_zero())
}

pub fn tick_due(elapsed: Duration, budget: Duration) -> bool {
    remaining_budget(elapsed, budget).is_none()
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}
