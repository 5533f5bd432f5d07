mod loop_runner;
mod metrics;
mod scene;
mod tween;

pub use loop_runner::{run_app, AppError, LoopConfig, Pacing, RunSummary, PACING_ENV_VAR};
pub use scene::{EntityId, EntityIdAllocator, Scene, SceneCommand, SceneWorld, Vec2};
pub use tween::{run_to_completion, Ease, TimedTask, Timer, Tween, TweenPath};
