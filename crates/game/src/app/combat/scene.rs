use std::collections::HashMap;

use engine::{EntityId, Scene, SceneCommand, SceneWorld, Vec2};
use tracing::{debug, info, warn};

use super::combatant::DamageOutcome;
use super::enemy::{ActionTarget, Enemy, UnitTemplate};
use super::events::{CombatEvent, CombatEventBus, CombatEventCounts, Listener};
use super::intents::{CombatIntent, CombatIntentApplyStats, CombatIntentQueue};
use super::lanes::Lane;
use super::player::{Player, TargetCandidate};
use super::presentation::{Effect, Presentation, TurnIndicator};
use super::scheduler::{CombatOutcome, TurnHost, TurnScheduler, WaveRequest};
use super::waves::{SpawnSurface, WaveCoordinator};
use crate::app::config::{MatchConfig, PlayerSettings};

/// Re-delivery rounds per tick for events raised while delivering events.
const MAX_NOTIFICATION_PASSES: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombatSystemId {
    TurnScheduling,
    Actions,
    Resolution,
    Notifications,
    Cleanup,
}

const COMBAT_SYSTEM_ORDER: [CombatSystemId; 5] = [
    CombatSystemId::TurnScheduling,
    CombatSystemId::Actions,
    CombatSystemId::Resolution,
    CombatSystemId::Notifications,
    CombatSystemId::Cleanup,
];

/// One match: a player, lanes of enemies, and the turn loop that drives them.
pub struct CombatScene {
    player_settings: PlayerSettings,
    attack_interval_seconds: f32,
    templates: HashMap<String, UnitTemplate>,
    waves_enabled: bool,
    player: Option<Player>,
    enemies: SceneWorld<Enemy>,
    scheduler: TurnScheduler,
    coordinator: WaveCoordinator,
    events: CombatEventBus,
    intents: CombatIntentQueue,
    presentation: Box<dyn Presentation>,
    last_tick_order: Vec<CombatSystemId>,
    ticks: u64,
    outcome_reported: bool,
}

impl CombatScene {
    pub fn new(config: &MatchConfig, presentation: Box<dyn Presentation>) -> Self {
        let templates = config
            .templates
            .iter()
            .map(|template| (template.name.clone(), template.clone()))
            .collect();
        Self {
            player_settings: config.player.clone(),
            attack_interval_seconds: config.timing.player_attack_interval_seconds,
            templates,
            waves_enabled: config.waves.enabled,
            player: None,
            enemies: SceneWorld::default(),
            scheduler: TurnScheduler::new(config.timing),
            coordinator: WaveCoordinator::new(
                config.waves.mode,
                config.waves.catalog.clone(),
                config.waves.unit_thresholds.clone(),
                config.lanes,
                config.rng_seed,
            ),
            events: CombatEventBus::default(),
            intents: CombatIntentQueue::default(),
            presentation,
            last_tick_order: Vec::with_capacity(COMBAT_SYSTEM_ORDER.len()),
            ticks: 0,
            outcome_reported: false,
        }
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn enemies(&self) -> &SceneWorld<Enemy> {
        &self.enemies
    }

    pub fn living_enemy_count(&self) -> usize {
        living_enemy_ids(&self.enemies, &self.events).len()
    }

    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    pub fn coordinator(&self) -> &WaveCoordinator {
        &self.coordinator
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        self.scheduler.outcome()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_tick_event_counts(&self) -> CombatEventCounts {
        self.events.last_tick_counts()
    }

    pub fn last_tick_apply_stats(&self) -> CombatIntentApplyStats {
        self.intents.last_tick_apply_stats()
    }

    /// Spawns one enemy from a named template into the first lane with room.
    ///
    /// Intended for use between ticks; the enemy is live immediately.
    pub fn spawn_enemy(&mut self, template: &str) -> Option<EntityId> {
        let player_position = self.player.as_ref().map(Player::position);
        let mut spawner = EnemySpawner {
            enemies: &mut self.enemies,
            events: &mut self.events,
            presentation: &mut *self.presentation,
            templates: &self.templates,
            player_position,
        };
        let id = self.coordinator.spawn_enemy(template, &mut spawner)?;
        self.enemies.apply_pending();
        Some(id)
    }

    fn run_system(&mut self, system_id: CombatSystemId, dt_seconds: f32) {
        match system_id {
            CombatSystemId::TurnScheduling => {
                let mut host = SceneTurnHost {
                    player: &mut self.player,
                    enemies: &mut self.enemies,
                    coordinator: &mut self.coordinator,
                    waves_enabled: self.waves_enabled,
                    events: &mut self.events,
                    presentation: &mut *self.presentation,
                    templates: &self.templates,
                };
                self.scheduler.update(dt_seconds, &mut host);
            }
            CombatSystemId::Actions => self.run_actions(dt_seconds),
            CombatSystemId::Resolution => {
                let intents = self.intents.drain_current_tick();
                let stats = self.apply_intents_at_safe_point(intents);
                self.intents.set_last_tick_apply_stats(stats);
            }
            CombatSystemId::Notifications => self.deliver_notifications(),
            CombatSystemId::Cleanup => {
                self.enemies.apply_pending();
                self.events.finish_tick_rollover();
            }
        }
    }

    fn run_actions(&mut self, dt_seconds: f32) {
        let candidates: Vec<TargetCandidate> = self
            .enemies
            .iter()
            .filter(|(id, enemy)| enemy.combatant().is_alive() && !self.events.has_died(*id))
            .map(|(id, enemy)| TargetCandidate {
                id,
                hp: enemy.combatant().current_hp(),
                position: enemy.position(),
            })
            .collect();

        if let Some(player) = self.player.as_mut() {
            if player.combatant().is_alive()
                && player.advance(dt_seconds, &candidates, &mut self.intents)
            {
                self.events.emit(CombatEvent::FinishedActions {
                    entity: player.id(),
                });
            }
        }

        let target = self
            .player
            .as_ref()
            .filter(|player| player.combatant().is_alive())
            .map(|player| ActionTarget {
                id: player.id(),
                position: player.position(),
            });
        for (id, enemy) in self.enemies.iter_mut() {
            if !enemy.combatant().is_alive() {
                continue;
            }
            if enemy.advance(id, dt_seconds, target, &mut self.intents) {
                self.events.emit(CombatEvent::FinishedActions { entity: id });
            }
        }
    }

    fn apply_intents_at_safe_point(&mut self, intents: Vec<CombatIntent>) -> CombatIntentApplyStats {
        let mut stats = CombatIntentApplyStats::default();
        for intent in intents {
            stats.record_intent(intent.kind());
            match intent {
                CombatIntent::PlayEffect(effect) => self.presentation.play_effect(effect),
                CombatIntent::ApplyDamage {
                    source,
                    target,
                    amount,
                } => {
                    let is_player = self.player.as_ref().is_some_and(|p| p.id() == target);
                    let combatant = if is_player {
                        self.player.as_mut().map(Player::combatant_mut)
                    } else {
                        self.enemies.find_mut(target).map(Enemy::combatant_mut)
                    };
                    let Some(combatant) = combatant else {
                        stats.record_invalid_target();
                        debug!(source = source.0, entity = target.0, "damage_target_missing");
                        continue;
                    };
                    let max_hp = combatant.max_hp();
                    match combatant.take_damage(amount) {
                        DamageOutcome::Ignored => {
                            stats.record_invalid_target();
                            debug!(source = source.0, entity = target.0, "damage_target_dead");
                        }
                        DamageOutcome::Wounded { hp } => {
                            self.presentation.on_damaged(target, amount, hp, max_hp);
                            self.events.emit(CombatEvent::Damaged {
                                entity: target,
                                amount,
                                hp,
                            });
                        }
                        DamageOutcome::Killed => {
                            self.presentation.on_damaged(target, amount, 0, max_hp);
                            self.events.emit(CombatEvent::Damaged {
                                entity: target,
                                amount,
                                hp: 0,
                            });
                            stats.record_kill();
                            self.events.emit(CombatEvent::Died { entity: target });
                            if is_player {
                                info!(player = target.0, source = source.0, "player_died");
                            } else {
                                self.enemies.despawn(target);
                                info!(enemy = target.0, source = source.0, "enemy_died");
                            }
                        }
                    }
                }
            }
        }
        stats
    }

    fn deliver_notifications(&mut self) {
        for _ in 0..MAX_NOTIFICATION_PASSES {
            if !self.events.has_queued() {
                return;
            }
            for delivery in self.events.drain() {
                for listener in delivery.listeners {
                    match listener {
                        Listener::TurnScheduler => self.scheduler.on_event(delivery.event),
                        Listener::WaveCoordinator => {
                            if let CombatEvent::Died { entity } = delivery.event {
                                if let Some(cleared) = self.coordinator.on_enemy_died(entity) {
                                    self.events.emit(cleared);
                                }
                            }
                        }
                    }
                }
            }
        }
        if self.events.has_queued() {
            warn!(
                passes = MAX_NOTIFICATION_PASSES,
                "notification_passes_exhausted"
            );
        }
    }
}

impl Scene for CombatScene {
    fn load(&mut self) {
        let id = self.enemies.allocate_id();
        let player = Player::new(
            id,
            self.player_settings.stats,
            self.player_settings.position,
            self.attack_interval_seconds,
        );
        self.events.subscribe(id, Listener::TurnScheduler);
        self.player = Some(player);
        info!(
            player = id.0,
            hp = self.player_settings.stats.max_hp,
            waves_enabled = self.waves_enabled,
            "combat_loaded"
        );

        if self.waves_enabled {
            let mut spawner = EnemySpawner {
                enemies: &mut self.enemies,
                events: &mut self.events,
                presentation: &mut *self.presentation,
                templates: &self.templates,
                player_position: Some(self.player_settings.position),
            };
            self.coordinator.start_next_wave(&mut spawner);
            self.enemies.apply_pending();
        }
    }

    fn update(&mut self, fixed_dt_seconds: f32) -> SceneCommand {
        self.last_tick_order.clear();
        for system_id in COMBAT_SYSTEM_ORDER {
            self.last_tick_order.push(system_id);
            self.run_system(system_id, fixed_dt_seconds);
        }
        self.ticks = self.ticks.saturating_add(1);

        let Some(outcome) = self.scheduler.outcome() else {
            return SceneCommand::None;
        };
        if !self.outcome_reported {
            self.outcome_reported = true;
            info!(
                outcome = ?outcome,
                wave = self.coordinator.wave(),
                rounds = self.scheduler.round(),
                ticks = self.ticks,
                "match_over"
            );
        }
        SceneCommand::Quit
    }

    fn unload(&mut self) {
        info!(
            ticks = self.ticks,
            wave = self.coordinator.wave(),
            remaining_enemies = self.enemies.entity_count(),
            "combat_unloaded"
        );
        self.enemies.clear();
        self.player = None;
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "wave {} round {} {:?}",
            self.coordinator.wave(),
            self.scheduler.round(),
            self.scheduler.phase()
        ))
    }
}

fn living_enemy_ids(enemies: &SceneWorld<Enemy>, events: &CombatEventBus) -> Vec<EntityId> {
    enemies
        .iter()
        .filter(|(id, enemy)| {
            enemy.combatant().is_alive()
                && !events.has_died(*id)
                && !enemies.is_pending_despawn(*id)
        })
        .map(|(id, _)| id)
        .collect()
}

/// Spawn surface over the scene's enemy storage.
struct EnemySpawner<'a> {
    enemies: &'a mut SceneWorld<Enemy>,
    events: &'a mut CombatEventBus,
    presentation: &'a mut dyn Presentation,
    templates: &'a HashMap<String, UnitTemplate>,
    player_position: Option<Vec2>,
}

impl SpawnSurface for EnemySpawner<'_> {
    fn spawn_at(&mut self, template: &str, lane: Lane, position: Vec2) -> Option<EntityId> {
        let Some(unit) = self.templates.get(template) else {
            warn!(template, "unknown_enemy_template");
            return None;
        };
        let enemy = Enemy::spawn(unit, lane, position, self.player_position);
        let id = self.enemies.spawn(enemy);
        self.events.subscribe(id, Listener::TurnScheduler);
        self.events.subscribe(id, Listener::WaveCoordinator);
        self.presentation.play_effect(Effect::Spawn { at: position });
        info!(
            enemy = id.0,
            template,
            kind = unit.behavior.name(),
            lane = ?lane,
            "enemy_spawned"
        );
        Some(id)
    }

    /// Counts enemies queued this tick, so one wave never stacks a lane.
    fn is_alive(&self, id: EntityId) -> bool {
        if self.events.has_died(id) || self.enemies.is_pending_despawn(id) {
            return false;
        }
        self.enemies.is_pending_spawn(id)
            || self
                .enemies
                .find(id)
                .is_some_and(|enemy| enemy.combatant().is_alive())
    }
}

/// The scheduler's view of the scene for one update.
struct SceneTurnHost<'a> {
    player: &'a mut Option<Player>,
    enemies: &'a mut SceneWorld<Enemy>,
    coordinator: &'a mut WaveCoordinator,
    waves_enabled: bool,
    events: &'a mut CombatEventBus,
    presentation: &'a mut dyn Presentation,
    templates: &'a HashMap<String, UnitTemplate>,
}

impl TurnHost for SceneTurnHost<'_> {
    fn player_alive(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|player| player.combatant().is_alive())
    }

    fn living_enemies(&self) -> Vec<EntityId> {
        living_enemy_ids(&*self.enemies, &*self.events)
    }

    fn is_enemy_alive(&self, id: EntityId) -> bool {
        !self.events.has_died(id)
            && self
                .enemies
                .find(id)
                .is_some_and(|enemy| enemy.combatant().is_alive())
    }

    fn start_player_turn(&mut self) -> Option<EntityId> {
        let player = self
            .player
            .as_mut()
            .filter(|player| player.combatant().is_alive())?;
        player.take_turn();
        Some(player.id())
    }

    fn start_enemy_turn(&mut self, id: EntityId) -> bool {
        let Some(enemy) = self.enemies.find_mut(id) else {
            return false;
        };
        if !enemy.combatant().is_alive() {
            return false;
        }
        enemy.reset_turn_flags();
        enemy.take_turn();
        true
    }

    fn abort_enemy_turn(&mut self, id: EntityId) {
        if let Some(enemy) = self.enemies.find_mut(id) {
            enemy.reset_turn_flags();
            debug!(enemy = id.0, "enemy_turn_aborted");
        }
    }

    fn start_next_wave(&mut self) -> WaveRequest {
        if !self.waves_enabled {
            return WaveRequest::Unavailable;
        }
        let mut spawner = EnemySpawner {
            enemies: &mut *self.enemies,
            events: &mut *self.events,
            presentation: &mut *self.presentation,
            templates: self.templates,
            player_position: self.player.as_ref().map(Player::position),
        };
        match self.coordinator.start_next_wave(&mut spawner) {
            Some(start) => WaveRequest::Started {
                wave: start.wave,
                spawned: start.spawned.len(),
            },
            None => WaveRequest::Exhausted,
        }
    }

    fn set_phase(&mut self, phase: TurnIndicator) {
        self.presentation.set_phase(phase);
    }
}
