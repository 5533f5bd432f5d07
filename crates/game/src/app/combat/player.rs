use engine::{EntityId, TimedTask, Timer, Vec2};
use tracing::{debug, warn};

use super::combatant::{Combatant, CombatantStats};
use super::intents::CombatIntentQueue;
use super::presentation::Effect;

/// A living enemy as the player sees it when choosing whom to strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    pub id: EntityId,
    pub hp: u32,
    pub position: Vec2,
}

/// Strictly lowest current HP wins; ties keep the earliest candidate.
pub fn select_lowest_hp_target(candidates: &[TargetCandidate]) -> Option<&TargetCandidate> {
    let mut best: Option<&TargetCandidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.hp >= current.hp => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[derive(Debug, Clone)]
struct PlayerTurn {
    strikes_remaining: u32,
    strikes_landed: u32,
    cooldown: Timer,
}

#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    combatant: Combatant,
    position: Vec2,
    attack_interval_seconds: f32,
    turn: Option<PlayerTurn>,
}

impl Player {
    pub fn new(
        id: EntityId,
        stats: CombatantStats,
        position: Vec2,
        attack_interval_seconds: f32,
    ) -> Self {
        Self {
            id,
            combatant: Combatant::new(stats),
            position,
            attack_interval_seconds: attack_interval_seconds.max(0.0),
            turn: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn combatant(&self) -> &Combatant {
        &self.combatant
    }

    pub fn combatant_mut(&mut self) -> &mut Combatant {
        &mut self.combatant
    }

    pub fn is_acting(&self) -> bool {
        self.turn.is_some()
    }

    pub fn take_turn(&mut self) {
        let strikes = self.combatant.attacks_per_turn();
        debug!(player = self.id.0, strikes, "player_turn_started");
        self.turn = Some(PlayerTurn {
            strikes_remaining: strikes,
            strikes_landed: 0,
            cooldown: Timer::new(0.0),
        });
    }

    /// Steps the current turn. Returns true on the tick the turn completes.
    ///
    /// The target is re-chosen before every strike, so a kill moves the next
    /// strike onto whoever is now weakest.
    pub fn advance(
        &mut self,
        dt_seconds: f32,
        candidates: &[TargetCandidate],
        intents: &mut CombatIntentQueue,
    ) -> bool {
        let Some(turn) = self.turn.as_mut() else {
            return false;
        };
        turn.cooldown.advance(dt_seconds);

        if turn.strikes_remaining > 0 && turn.cooldown.is_complete() {
            match select_lowest_hp_target(candidates) {
                Some(target) => {
                    intents.damage(self.id, target.id, self.combatant.attack_damage());
                    intents.effect(Effect::Slash {
                        at: target.position,
                    });
                    turn.strikes_remaining -= 1;
                    turn.strikes_landed = turn.strikes_landed.saturating_add(1);
                    turn.cooldown = Timer::new(self.attack_interval_seconds);
                }
                None => {
                    if turn.strikes_landed == 0 {
                        warn!(player = self.id.0, "player_turn_without_target");
                    }
                    turn.strikes_remaining = 0;
                }
            }
        }

        if turn.strikes_remaining == 0 && turn.cooldown.is_complete() {
            debug!(
                player = self.id.0,
                strikes = turn.strikes_landed,
                "player_turn_finished"
            );
            self.turn = None;
            return true;
        }
        false
    }
}
