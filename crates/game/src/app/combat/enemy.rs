use std::collections::VecDeque;

use engine::{Ease, EntityId, TimedTask, Timer, Tween, TweenPath, Vec2};
use serde::Deserialize;
use tracing::{debug, warn};

use super::combatant::{Combatant, CombatantStats};
use super::intents::CombatIntentQueue;
use super::lanes::Lane;
use super::presentation::Effect;

const MIN_MOVE_SECONDS: f32 = 0.1;
const MIN_MOVE_SPEED: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeleeParams {
    pub move_speed: f32,
    pub attack_range: f32,
    /// How many seconds of `move_speed` an out-of-range advance covers.
    pub advance_seconds: f32,
    pub attack_delay_seconds: f32,
    pub entrance_seconds: f32,
}

impl Default for MeleeParams {
    fn default() -> Self {
        Self {
            move_speed: 12.0,
            attack_range: 1.5,
            advance_seconds: 1.0,
            attack_delay_seconds: 0.2,
            entrance_seconds: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RangedParams {
    pub entrance_distance: f32,
    pub entrance_seconds: f32,
    pub projectile_seconds: f32,
    pub arc_height: f32,
    /// Muzzle position relative to the enemy.
    pub fire_offset: Vec2,
}

impl Default for RangedParams {
    fn default() -> Self {
        Self {
            entrance_distance: 1.0,
            entrance_seconds: 0.4,
            projectile_seconds: 0.5,
            arc_height: 1.0,
            fire_offset: Vec2::new(-0.4, 0.3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnemyKind {
    Melee(MeleeParams),
    Ranged(RangedParams),
    Default,
}

impl EnemyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Melee(_) => "melee",
            Self::Ranged(_) => "ranged",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitTemplate {
    pub name: String,
    pub stats: CombatantStats,
    pub behavior: EnemyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyTurnState {
    Idle,
    AwaitingReady,
    Acting,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnFlags {
    pub ready_to_attack: bool,
    pub finished_actions: bool,
}

/// The opponent as resolved for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionTarget {
    pub id: EntityId,
    pub position: Vec2,
}

/// A shot in the air. Damage is owed once the flight completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileFlight {
    tween: Tween,
    launched: bool,
}

impl ProjectileFlight {
    pub fn new(from: Vec2, to: Vec2, seconds: f32, arc_height: f32) -> Self {
        let path = if to.y > from.y {
            TweenPath::Arc { height: arc_height }
        } else {
            TweenPath::Line
        };
        Self {
            tween: Tween::new(from, to, seconds).with_path(path),
            launched: false,
        }
    }

    pub fn path(&self) -> TweenPath {
        self.tween.path()
    }

    pub fn position(&self) -> Vec2 {
        self.tween.position()
    }
}

impl TimedTask for ProjectileFlight {
    fn advance(&mut self, dt_seconds: f32) {
        self.tween.advance(dt_seconds);
    }

    fn is_complete(&self) -> bool {
        self.tween.is_complete()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ActionStep {
    Move(Tween),
    Strike { delay: Timer, landed: bool },
    Shot(ProjectileFlight),
}

#[derive(Debug, Clone)]
pub struct Enemy {
    template: String,
    kind: EnemyKind,
    combatant: Combatant,
    lane: Lane,
    home: Vec2,
    position: Vec2,
    flags: TurnFlags,
    state: EnemyTurnState,
    entrance: Option<Tween>,
    steps: VecDeque<ActionStep>,
}

impl Enemy {
    /// Builds an enemy at its lane slot and starts its entrance toward `player_position`.
    pub fn spawn(
        template: &UnitTemplate,
        lane: Lane,
        home: Vec2,
        player_position: Option<Vec2>,
    ) -> Self {
        let entrance =
            player_position.and_then(|player| entrance_for(template.behavior, home, player));
        Self {
            template: template.name.clone(),
            kind: template.behavior,
            combatant: Combatant::new(template.stats),
            lane,
            home,
            position: home,
            flags: TurnFlags {
                ready_to_attack: entrance.is_none(),
                finished_actions: false,
            },
            state: EnemyTurnState::Idle,
            entrance,
            steps: VecDeque::new(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn home(&self) -> Vec2 {
        self.home
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

    pub fn flags(&self) -> TurnFlags {
        self.flags
    }

    pub fn state(&self) -> EnemyTurnState {
        self.state
    }

    /// Clears the turn-local flags. Readiness survives only if the entrance is done.
    pub fn reset_turn_flags(&mut self) {
        self.flags = TurnFlags {
            ready_to_attack: self.entrance.is_none(),
            finished_actions: false,
        };
        self.state = EnemyTurnState::Idle;
        self.steps.clear();
    }

    pub fn take_turn(&mut self) {
        self.state = if self.flags.ready_to_attack {
            EnemyTurnState::Acting
        } else {
            EnemyTurnState::AwaitingReady
        };
        if self.state == EnemyTurnState::Acting {
            self.steps.clear();
        }
    }

    /// Steps the entrance and any turn in progress. Returns true on the tick
    /// the turn's actions are fully resolved.
    pub fn advance(
        &mut self,
        id: EntityId,
        dt_seconds: f32,
        target: Option<ActionTarget>,
        intents: &mut CombatIntentQueue,
    ) -> bool {
        self.advance_entrance(dt_seconds);

        let planning = match self.state {
            EnemyTurnState::Idle | EnemyTurnState::Finished => return false,
            EnemyTurnState::AwaitingReady => {
                if !self.flags.ready_to_attack {
                    return false;
                }
                self.state = EnemyTurnState::Acting;
                true
            }
            EnemyTurnState::Acting => self.steps.is_empty() && !self.flags.finished_actions,
        };

        if planning {
            let Some(target) = target else {
                warn!(enemy = id.0, "enemy_turn_without_target");
                return self.finish(id);
            };
            self.plan_actions(id, target, intents);
            if self.steps.is_empty() {
                return self.finish(id);
            }
        }

        self.run_front_step(id, dt_seconds, target, intents);
        if self.steps.is_empty() {
            return self.finish(id);
        }
        false
    }

    fn finish(&mut self, id: EntityId) -> bool {
        if self.flags.finished_actions {
            return false;
        }
        self.flags.finished_actions = true;
        self.state = EnemyTurnState::Finished;
        debug!(enemy = id.0, kind = self.kind.name(), "enemy_turn_finished");
        true
    }

    fn advance_entrance(&mut self, dt_seconds: f32) {
        let Some(entrance) = self.entrance.as_mut() else {
            return;
        };
        entrance.advance(dt_seconds);
        self.position = entrance.position();
        if entrance.is_complete() {
            self.entrance = None;
            self.flags.ready_to_attack = true;
        }
    }

    fn plan_actions(
        &mut self,
        id: EntityId,
        target: ActionTarget,
        intents: &mut CombatIntentQueue,
    ) {
        let attacks = self.combatant.attacks_per_turn();
        match self.kind {
            EnemyKind::Melee(params) => self.plan_melee(params, attacks, target),
            EnemyKind::Ranged(params) => {
                let fire_point = self.position.offset(params.fire_offset, 1.0);
                for _ in 0..attacks {
                    self.steps.push_back(ActionStep::Shot(ProjectileFlight::new(
                        fire_point,
                        target.position,
                        params.projectile_seconds,
                        params.arc_height,
                    )));
                }
            }
            EnemyKind::Default => {
                for _ in 0..attacks {
                    intents.damage(id, target.id, self.combatant.attack_damage());
                }
            }
        }
        debug!(
            enemy = id.0,
            kind = self.kind.name(),
            attacks,
            steps = self.steps.len(),
            "enemy_turn_planned"
        );
    }

    fn plan_melee(&mut self, params: MeleeParams, attacks: u32, target: ActionTarget) {
        let distance = self.position.distance_to(target.position);
        if distance <= params.attack_range {
            let strike_point = target
                .position
                .offset(target.position.direction_to(self.position), params.attack_range);
            let approach = melee_move(self.position, strike_point, params.move_speed);
            self.steps.push_back(ActionStep::Move(approach));
            for _ in 0..attacks {
                self.steps.push_back(ActionStep::Strike {
                    delay: Timer::new(params.attack_delay_seconds),
                    landed: false,
                });
            }
            let retreat = melee_move(strike_point, self.home, params.move_speed);
            self.steps.push_back(ActionStep::Move(retreat));
        } else {
            let reach = params.move_speed * params.advance_seconds;
            let step = reach.min(distance - params.attack_range);
            let destination = self
                .position
                .offset(self.position.direction_to(target.position), step);
            let advance = melee_move(self.position, destination, params.move_speed);
            self.steps.push_back(ActionStep::Move(advance));
        }
    }

    fn run_front_step(
        &mut self,
        id: EntityId,
        dt_seconds: f32,
        target: Option<ActionTarget>,
        intents: &mut CombatIntentQueue,
    ) {
        let damage = self.combatant.attack_damage();
        let Some(step) = self.steps.front_mut() else {
            return;
        };
        let complete = match step {
            ActionStep::Move(tween) => {
                tween.advance(dt_seconds);
                self.position = tween.position();
                tween.is_complete()
            }
            ActionStep::Strike { delay, landed } => {
                if !*landed {
                    let Some(target) = target else {
                        debug!(enemy = id.0, "strike_target_gone");
                        self.steps.clear();
                        return;
                    };
                    intents.damage(id, target.id, damage);
                    intents.effect(Effect::Slash {
                        at: target.position,
                    });
                    *landed = true;
                }
                delay.advance(dt_seconds);
                delay.is_complete()
            }
            ActionStep::Shot(flight) => {
                if !flight.launched {
                    flight.launched = true;
                    intents.effect(Effect::Projectile {
                        from: flight.tween.start(),
                        to: flight.tween.end(),
                    });
                }
                flight.advance(dt_seconds);
                if flight.is_complete() {
                    let Some(target) = target else {
                        debug!(enemy = id.0, "projectile_target_gone");
                        self.steps.clear();
                        return;
                    };
                    intents.damage(id, target.id, damage);
                }
                flight.is_complete()
            }
        };
        if complete {
            self.steps.pop_front();
        }
    }
}

fn entrance_for(kind: EnemyKind, home: Vec2, player: Vec2) -> Option<Tween> {
    let direction = home.direction_to(player);
    let (distance, seconds) = match kind {
        EnemyKind::Melee(params) => (params.move_speed * 0.5, params.entrance_seconds),
        EnemyKind::Ranged(params) => (params.entrance_distance, params.entrance_seconds),
        EnemyKind::Default => return None,
    };
    let destination = home.offset(direction, distance);
    Some(Tween::new(home, destination, seconds).with_ease(Ease::InOutQuad))
}

fn melee_move(from: Vec2, to: Vec2, move_speed: f32) -> Tween {
    let speed = (2.0 * move_speed).max(MIN_MOVE_SPEED);
    let seconds = (from.distance_to(to) / speed).max(MIN_MOVE_SECONDS);
    Tween::new(from, to, seconds).with_ease(Ease::InOutQuad)
}

#[cfg(test)]
mod tests {
    use engine::run_to_completion;

    use super::*;
    use crate::app::combat::intents::CombatIntent;

    const DT: f32 = 0.05;
    const ENEMY: EntityId = EntityId(1);
    const PLAYER: EntityId = EntityId(0);

    fn template(behavior: EnemyKind, attack_speed: f32) -> UnitTemplate {
        UnitTemplate {
            name: "unit".to_string(),
            stats: CombatantStats {
                max_hp: 20,
                attack_damage: 4,
                attack_speed,
            },
            behavior,
        }
    }

    fn target_at(position: Vec2) -> Option<ActionTarget> {
        Some(ActionTarget {
            id: PLAYER,
            position,
        })
    }

    fn damage_count(intents: &CombatIntentQueue) -> usize {
        intents
            .pending()
            .iter()
            .filter(|intent| {
                matches!(intent, CombatIntent::ApplyDamage { target, .. } if *target == PLAYER)
            })
            .count()
    }

    /// Runs a started turn to completion and returns how many ticks it took.
    fn run_turn(
        enemy: &mut Enemy,
        target: Option<ActionTarget>,
        intents: &mut CombatIntentQueue,
        max_ticks: u32,
    ) -> Option<u32> {
        for tick in 1..=max_ticks {
            if enemy.advance(ENEMY, DT, target, intents) {
                return Some(tick);
            }
        }
        None
    }

    #[test]
    fn default_enemy_attacks_immediately() {
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Default, 3.0),
            Lane::Middle,
            Vec2::new(5.0, 0.0),
            Some(Vec2::ZERO),
        );
        let mut intents = CombatIntentQueue::default();
        enemy.reset_turn_flags();
        enemy.take_turn();
        assert!(enemy.advance(ENEMY, DT, target_at(Vec2::ZERO), &mut intents));
        assert_eq!(damage_count(&intents), 3);
        assert!(enemy.flags().finished_actions);
        assert!(!enemy.advance(ENEMY, DT, target_at(Vec2::ZERO), &mut intents));
    }

    #[test]
    fn entrance_slides_half_move_speed_toward_player() {
        let params = MeleeParams {
            move_speed: 2.0,
            ..MeleeParams::default()
        };
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Melee(params), 1.0),
            Lane::Middle,
            Vec2::new(10.0, 0.0),
            Some(Vec2::ZERO),
        );
        let mut intents = CombatIntentQueue::default();
        assert!(!enemy.advance(ENEMY, 0.2, target_at(Vec2::ZERO), &mut intents));
        assert!(!enemy.advance(ENEMY, 0.2, target_at(Vec2::ZERO), &mut intents));
        assert!(enemy.flags().ready_to_attack);
        assert_eq!(enemy.position(), Vec2::new(9.0, 0.0));
        assert_eq!(enemy.home(), Vec2::new(10.0, 0.0));
        assert!(intents.pending().is_empty());
    }

    #[test]
    fn melee_waits_for_entrance_before_acting() {
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Melee(MeleeParams::default()), 1.0),
            Lane::Middle,
            Vec2::new(10.0, 0.0),
            Some(Vec2::ZERO),
        );
        assert!(!enemy.flags().ready_to_attack);
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();
        assert_eq!(enemy.state(), EnemyTurnState::AwaitingReady);

        assert!(!enemy.advance(ENEMY, 0.2, target_at(Vec2::ZERO), &mut intents));
        assert_eq!(enemy.state(), EnemyTurnState::AwaitingReady);
        let _ = enemy.advance(ENEMY, 0.2, target_at(Vec2::ZERO), &mut intents);
        assert!(enemy.flags().ready_to_attack);
        assert_eq!(enemy.state(), EnemyTurnState::Acting);
    }

    #[test]
    fn melee_out_of_range_advances_without_attacking() {
        let params = MeleeParams {
            move_speed: 2.0,
            attack_range: 1.5,
            advance_seconds: 1.0,
            ..MeleeParams::default()
        };
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Melee(params), 1.0),
            Lane::Middle,
            Vec2::new(10.0, 0.0),
            None,
        );
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();
        let ticks = run_turn(&mut enemy, target_at(Vec2::ZERO), &mut intents, 200);
        assert!(ticks.is_some());
        assert_eq!(damage_count(&intents), 0);
        assert_eq!(enemy.position(), Vec2::new(8.0, 0.0));
    }

    #[test]
    fn melee_advance_stops_at_attack_range() {
        let params = MeleeParams {
            move_speed: 10.0,
            attack_range: 1.5,
            ..MeleeParams::default()
        };
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Melee(params), 1.0),
            Lane::Middle,
            Vec2::new(4.0, 0.0),
            None,
        );
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();
        run_turn(&mut enemy, target_at(Vec2::ZERO), &mut intents, 200).expect("turn ends");
        assert!((enemy.position().x - 1.5).abs() < 0.0001);
    }

    #[test]
    fn melee_in_range_strikes_then_returns_home() {
        let home = Vec2::new(1.0, 0.0);
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Melee(MeleeParams::default()), 2.0),
            Lane::Middle,
            home,
            None,
        );
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();
        run_turn(&mut enemy, target_at(Vec2::ZERO), &mut intents, 200).expect("turn ends");

        assert_eq!(damage_count(&intents), 2);
        let slashes = intents
            .pending()
            .iter()
            .filter(|intent| matches!(intent, CombatIntent::PlayEffect(Effect::Slash { .. })))
            .count();
        assert_eq!(slashes, 2);
        assert_eq!(enemy.position(), home);
    }

    #[test]
    fn melee_strike_stops_quietly_when_target_gone() {
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Melee(MeleeParams::default()), 2.0),
            Lane::Middle,
            Vec2::new(1.0, 0.0),
            None,
        );
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();
        assert!(!enemy.advance(ENEMY, DT, target_at(Vec2::ZERO), &mut intents));
        let finished = run_turn(&mut enemy, None, &mut intents, 200);
        assert!(finished.is_some());
        assert_eq!(damage_count(&intents), 0);
    }

    #[test]
    fn ranged_damage_lands_after_travel_time() {
        let params = RangedParams {
            projectile_seconds: 0.2,
            fire_offset: Vec2::ZERO,
            ..RangedParams::default()
        };
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Ranged(params), 2.0),
            Lane::Middle,
            Vec2::new(6.0, 0.0),
            None,
        );
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();

        assert!(!enemy.advance(ENEMY, 0.1, target_at(Vec2::ZERO), &mut intents));
        assert_eq!(damage_count(&intents), 0);
        assert!(!enemy.advance(ENEMY, 0.1, target_at(Vec2::ZERO), &mut intents));
        assert_eq!(damage_count(&intents), 1);
        assert!(!enemy.advance(ENEMY, 0.1, target_at(Vec2::ZERO), &mut intents));
        assert!(enemy.advance(ENEMY, 0.1, target_at(Vec2::ZERO), &mut intents));
        assert_eq!(damage_count(&intents), 2);
    }

    #[test]
    fn projectile_arcs_only_when_target_is_above() {
        let upward = ProjectileFlight::new(Vec2::ZERO, Vec2::new(-4.0, 1.0), 0.5, 2.0);
        assert_eq!(upward.path(), TweenPath::Arc { height: 2.0 });
        let level = ProjectileFlight::new(Vec2::ZERO, Vec2::new(-4.0, 0.0), 0.5, 2.0);
        assert_eq!(level.path(), TweenPath::Line);

        let mut flight = level;
        assert_eq!(run_to_completion(&mut flight, 0.25, 10), Some(2));
        assert_eq!(flight.position(), Vec2::new(-4.0, 0.0));
    }

    #[test]
    fn reset_keeps_readiness_after_entrance() {
        let mut enemy = Enemy::spawn(
            &template(EnemyKind::Default, 1.0),
            Lane::Top,
            Vec2::new(3.0, 1.0),
            Some(Vec2::ZERO),
        );
        let mut intents = CombatIntentQueue::default();
        enemy.take_turn();
        assert!(enemy.advance(ENEMY, DT, target_at(Vec2::ZERO), &mut intents));
        enemy.reset_turn_flags();
        assert_eq!(
            enemy.flags(),
            TurnFlags {
                ready_to_attack: true,
                finished_actions: false,
            }
        );
        assert_eq!(enemy.state(), EnemyTurnState::Idle);
    }
}
