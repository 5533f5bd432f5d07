use std::env;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator};
use super::scene::SceneRuntime;
use super::{Scene, SceneCommand};

pub const PACING_ENV_VAR: &str = "LANEFALL_PACING";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Ticks run back to back with no sleeping.
    Unpaced,
    /// Ticks follow the wall clock at `target_tps`.
    RealTime,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub pacing: Pacing,
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            pacing: Pacing::Unpaced,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("scene did not quit within the tick budget of {max_ticks} ticks")]
    TickBudgetExhausted { max_ticks: u64 },
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub simulated_seconds: f32,
    pub wall_seconds: f32,
}

impl RunSummary {
    /// Ticks per wall-clock second over the whole run.
    pub fn average_tps(&self) -> f32 {
        self.ticks as f32 / self.wall_seconds.max(f32::EPSILON)
    }
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<RunSummary, AppError> {
    let mut runtime = SceneRuntime::new(scene);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let pacing = resolve_pacing(config.pacing);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        pacing = ?pacing,
        max_ticks = ?config.max_ticks,
        "loop_config"
    );

    runtime.load_if_needed();
    info!(title = ?runtime.debug_title(), "scene_loaded");

    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut driver = TickDriver {
        runtime: &mut runtime,
        metrics_accumulator: &mut metrics_accumulator,
        fixed_dt_seconds,
        max_ticks: config.max_ticks,
        last_title: None,
    };

    let outcome = match pacing {
        Pacing::Unpaced => driver.run_unpaced(),
        Pacing::RealTime => {
            driver.run_real_time(fixed_dt, max_frame_delta, max_ticks_per_frame)
        }
    };

    runtime.shutdown();
    let summary = RunSummary {
        ticks: metrics_accumulator.total_ticks(),
        simulated_seconds: metrics_accumulator.simulated_seconds(),
        wall_seconds: metrics_accumulator.wall_seconds(Instant::now()),
    };
    info!(
        ticks = summary.ticks,
        simulated_seconds = summary.simulated_seconds,
        wall_seconds = summary.wall_seconds,
        "shutdown"
    );

    outcome.map(|()| summary)
}

struct TickDriver<'a> {
    runtime: &'a mut SceneRuntime,
    metrics_accumulator: &'a mut MetricsAccumulator,
    fixed_dt_seconds: f32,
    max_ticks: Option<u64>,
    last_title: Option<String>,
}

impl TickDriver<'_> {
    fn run_unpaced(&mut self) -> Result<(), AppError> {
        loop {
            if self.tick()? == SceneCommand::Quit {
                return Ok(());
            }
            self.maybe_log_metrics(Instant::now());
        }
    }

    fn run_real_time(
        &mut self,
        fixed_dt: Duration,
        max_frame_delta: Duration,
        max_ticks_per_frame: u32,
    ) -> Result<(), AppError> {
        let mut accumulator = Duration::ZERO;
        let mut last_frame_instant = Instant::now();

        loop {
            let elapsed_since_frame = Instant::now().saturating_duration_since(last_frame_instant);
            let pacing_sleep = compute_cap_sleep(elapsed_since_frame, Some(fixed_dt));
            if pacing_sleep > Duration::ZERO {
                thread::sleep(pacing_sleep);
            }

            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            for _ in 0..step_plan.ticks_to_run {
                if self.tick()? == SceneCommand::Quit {
                    return Ok(());
                }
            }
            accumulator = step_plan.remaining_accumulator;

            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }

            self.maybe_log_metrics(now);
        }
    }

    fn tick(&mut self) -> Result<SceneCommand, AppError> {
        if let Some(max_ticks) = self.max_ticks {
            if self.metrics_accumulator.total_ticks() >= max_ticks {
                warn!(max_ticks, "tick_budget_exhausted");
                return Err(AppError::TickBudgetExhausted { max_ticks });
            }
        }

        let command = self.runtime.update(self.fixed_dt_seconds);
        self.metrics_accumulator.record_tick(self.fixed_dt_seconds);

        let next_title = self.runtime.debug_title();
        if next_title != self.last_title {
            if let Some(title) = &next_title {
                debug!(title = title.as_str(), "scene_title_changed");
            }
            self.last_title = next_title;
        }

        if command == SceneCommand::Quit {
            info!(
                ticks = self.metrics_accumulator.total_ticks(),
                "scene_requested_quit"
            );
        }
        Ok(command)
    }

    fn maybe_log_metrics(&mut self, now: Instant) {
        if let Some(snapshot) = self.metrics_accumulator.maybe_snapshot(now) {
            log_metrics(&snapshot);
        }
    }
}

fn log_metrics(snapshot: &LoopMetricsSnapshot) {
    info!(
        tps = snapshot.tps,
        total_ticks = snapshot.total_ticks,
        simulated_seconds = snapshot.simulated_seconds,
        "loop_metrics"
    );
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        accumulator = Duration::ZERO;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn parse_pacing(value: &str) -> Option<Pacing> {
    match value.trim().to_ascii_lowercase().as_str() {
        "unpaced" | "fast" => Some(Pacing::Unpaced),
        "realtime" | "real_time" | "real-time" => Some(Pacing::RealTime),
        _ => None,
    }
}

fn resolve_pacing(config_pacing: Pacing) -> Pacing {
    match env::var(PACING_ENV_VAR) {
        Ok(value) => match parse_pacing(&value) {
            Some(pacing) => pacing,
            None => {
                warn!(
                    env_var = PACING_ENV_VAR,
                    value = value.as_str(),
                    "invalid pacing env var value; falling back to config"
                );
                config_pacing
            }
        },
        Err(env::VarError::NotPresent) => config_pacing,
        Err(err) => {
            warn!(
                env_var = PACING_ENV_VAR,
                error = %err,
                "unable to read pacing env var; falling back to config"
            );
            config_pacing
        }
    }
}
