use engine::{EntityId, Vec2};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnIndicator {
    PlayerTurn,
    EnemyTurn,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Slash { at: Vec2 },
    Projectile { from: Vec2, to: Vec2 },
    Spawn { at: Vec2 },
}

impl Effect {
    fn name(self) -> &'static str {
        match self {
            Self::Slash { .. } => "slash",
            Self::Projectile { .. } => "projectile",
            Self::Spawn { .. } => "spawn",
        }
    }
}

/// Outbound hooks for whatever draws the match. Calls are fire-and-forget.
pub trait Presentation {
    fn on_damaged(&mut self, target: EntityId, amount: u32, hp: u32, max_hp: u32);
    fn set_phase(&mut self, phase: TurnIndicator);
    fn play_effect(&mut self, effect: Effect);
}

/// Headless presentation that narrates through `tracing`.
#[derive(Debug, Default)]
pub struct TracingPresentation {
    phase: Option<TurnIndicator>,
}

impl Presentation for TracingPresentation {
    fn on_damaged(&mut self, target: EntityId, amount: u32, hp: u32, max_hp: u32) {
        info!(entity = target.0, amount, hp, max_hp, "health_changed");
    }

    fn set_phase(&mut self, phase: TurnIndicator) {
        if self.phase == Some(phase) {
            return;
        }
        self.phase = Some(phase);
        info!(phase = ?phase, "turn_indicator");
    }

    fn play_effect(&mut self, effect: Effect) {
        debug!(effect = effect.name(), detail = ?effect, "effect_played");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn on_damaged(&mut self, _target: EntityId, _amount: u32, _hp: u32, _max_hp: u32) {}

    fn set_phase(&mut self, _phase: TurnIndicator) {}

    fn play_effect(&mut self, _effect: Effect) {}
}
