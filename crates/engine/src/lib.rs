pub mod app;

pub use app::{
    run_app, run_to_completion, AppError, Ease, EntityId, EntityIdAllocator, LoopConfig, Pacing,
    RunSummary, Scene, SceneCommand, SceneWorld, TimedTask, Timer, Tween, TweenPath, Vec2, PACING_ENV_VAR,
};
