pub mod combatant;
pub mod enemy;
pub mod events;
pub mod intents;
pub mod lanes;
pub mod player;
pub mod presentation;
pub mod scene;
pub mod scheduler;
pub mod waves;

pub use combatant::{attacks_for_speed, Combatant, CombatantStats, DamageOutcome};
pub use enemy::{
    ActionTarget, Enemy, EnemyKind, EnemyTurnState, MeleeParams, ProjectileFlight, RangedParams,
    TurnFlags, UnitTemplate,
};
pub use events::{CombatEvent, CombatEventBus, CombatEventCounts, CombatEventKind, Listener};
pub use intents::{CombatIntent, CombatIntentApplyStats, CombatIntentKind, CombatIntentQueue};
pub use lanes::{Lane, LaneSettings, LaneSpawner, CANONICAL_LANE_ORDER};
pub use player::{select_lowest_hp_target, Player, TargetCandidate};
pub use presentation::{Effect, NullPresentation, Presentation, TracingPresentation, TurnIndicator};
pub use scene::CombatScene;
pub use scheduler::{CombatOutcome, TimingSettings, TurnHost, TurnPhase, TurnScheduler, WaveRequest};
pub use waves::{
    default_unit_thresholds, units_for_wave, CatalogEntry, SpawnSurface, UnitThreshold,
    WaveCoordinator, WaveMode, WaveStart,
};
