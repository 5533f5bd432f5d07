use std::time::{Duration, Instant};

/// Tick throughput over one log interval plus running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopMetricsSnapshot {
    pub(crate) tps: f32,
    pub(crate) total_ticks: u64,
    pub(crate) simulated_seconds: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    run_start: Instant,
    interval_start: Instant,
    interval: Duration,
    interval_ticks: u32,
    total_ticks: u64,
    simulated_seconds: f32,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    fn starting_at(start: Instant, interval: Duration) -> Self {
        Self {
            run_start: start,
            interval_start: start,
            interval,
            interval_ticks: 0,
            total_ticks: 0,
            simulated_seconds: 0.0,
        }
    }

    pub(crate) fn record_tick(&mut self, fixed_dt_seconds: f32) {
        self.interval_ticks = self.interval_ticks.saturating_add(1);
        self.total_ticks = self.total_ticks.saturating_add(1);
        self.simulated_seconds += fixed_dt_seconds;
    }

    pub(crate) fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub(crate) fn simulated_seconds(&self) -> f32 {
        self.simulated_seconds
    }

    /// Closes the interval once it has run its length.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }
        let snapshot = LoopMetricsSnapshot {
            tps: self.interval_ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
            total_ticks: self.total_ticks,
            simulated_seconds: self.simulated_seconds,
        };
        self.interval_start = now;
        self.interval_ticks = 0;
        Some(snapshot)
    }

    pub(crate) fn wall_seconds(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.run_start).as_secs_f32()
    }
}
