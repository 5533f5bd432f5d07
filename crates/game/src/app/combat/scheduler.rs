use std::collections::HashSet;

use engine::{EntityId, TimedTask, Timer};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::events::CombatEvent;
use super::presentation::TurnIndicator;

/// Upper bound on zero-time stage transitions taken within one tick.
const MAX_TRANSITIONS_PER_TICK: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSettings {
    pub turn_delay_seconds: f32,
    pub wave_transition_seconds: f32,
    pub player_attack_interval_seconds: f32,
    /// Gives up on an enemy slot that has not finished within this many seconds.
    pub turn_timeout_seconds: Option<f32>,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            turn_delay_seconds: 0.5,
            wave_transition_seconds: 2.0,
            player_attack_interval_seconds: 0.3,
            turn_timeout_seconds: Some(30.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    PlayerTurn,
    EnemyTurn,
    WaveTransition,
    CombatEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    PlayerDefeated,
    /// A level ran out of waves with the player standing.
    Victory,
    /// No further wave could be produced.
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveRequest {
    Started { wave: u32, spawned: usize },
    Exhausted,
    /// Waves are switched off for this match.
    Unavailable,
}

/// What the scheduler drives. Implemented by the combat scene.
pub trait TurnHost {
    fn player_alive(&self) -> bool;
    /// Living enemies in registration order.
    fn living_enemies(&self) -> Vec<EntityId>;
    fn is_enemy_alive(&self, id: EntityId) -> bool;
    /// Starts the player's turn and returns the id whose completion to wait for.
    fn start_player_turn(&mut self) -> Option<EntityId>;
    /// Resets the enemy's turn flags and starts its turn.
    fn start_enemy_turn(&mut self, id: EntityId) -> bool;
    /// Cancels a turn the scheduler gave up on so it cannot finish later.
    fn abort_enemy_turn(&mut self, id: EntityId);
    fn start_next_wave(&mut self) -> WaveRequest;
    fn set_phase(&mut self, phase: TurnIndicator);
}

#[derive(Debug, Clone)]
enum Stage {
    RoundStart,
    AwaitPlayer { player: EntityId },
    InterTurnDelay(Timer),
    EnemyPassStart,
    EnemySlot {
        index: usize,
        started: bool,
        timeout: Option<Timer>,
    },
    AwaitAllSettled,
    RoundEndDelay(Timer),
    WaveSpawnTick { waited: bool },
    WaveTransition(Timer),
    Ended(CombatOutcome),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Self::RoundStart => "round_start",
            Self::AwaitPlayer { .. } => "await_player",
            Self::InterTurnDelay(_) => "inter_turn_delay",
            Self::EnemyPassStart => "enemy_pass_start",
            Self::EnemySlot { .. } => "enemy_slot",
            Self::AwaitAllSettled => "await_all_settled",
            Self::RoundEndDelay(_) => "round_end_delay",
            Self::WaveSpawnTick { .. } => "wave_spawn_tick",
            Self::WaveTransition(_) => "wave_transition",
            Self::Ended(_) => "ended",
        }
    }
}

enum Flow {
    Continue,
    Yield,
}

/// Book-keeping for one enemy pass.
#[derive(Debug, Default)]
struct EnemyPass {
    snapshot: Vec<EntityId>,
    living_at_start: usize,
    finished: HashSet<EntityId>,
    destroyed: HashSet<EntityId>,
    timed_out: HashSet<EntityId>,
}

impl EnemyPass {
    fn is_settled(&self, id: EntityId) -> bool {
        self.finished.contains(&id) || self.destroyed.contains(&id) || self.timed_out.contains(&id)
    }
}

/// Polled state machine for alternating player and enemy turns.
///
/// Completion arrives through [`TurnScheduler::on_event`]; every wait is a
/// stage re-checked once per tick.
#[derive(Debug)]
pub struct TurnScheduler {
    timing: TimingSettings,
    stage: Stage,
    round: u32,
    player_finished: bool,
    pass: EnemyPass,
    waves_cleared: u32,
    /// Wave whose clear has been seen but not yet followed by a transition.
    pending_wave_clear: Option<u32>,
}

impl TurnScheduler {
    pub fn new(timing: TimingSettings) -> Self {
        Self {
            timing,
            stage: Stage::RoundStart,
            round: 0,
            player_finished: false,
            pass: EnemyPass::default(),
            waves_cleared: 0,
            pending_wave_clear: None,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn waves_cleared(&self) -> u32 {
        self.waves_cleared
    }

    pub fn pending_wave_clear(&self) -> Option<u32> {
        self.pending_wave_clear
    }

    /// Finished notifications counted for the current enemy pass.
    pub fn finished_this_pass(&self) -> usize {
        self.pass.finished.len()
    }

    pub fn phase(&self) -> TurnPhase {
        match self.stage {
            Stage::RoundStart | Stage::AwaitPlayer { .. } | Stage::InterTurnDelay(_) => {
                TurnPhase::PlayerTurn
            }
            Stage::EnemyPassStart
            | Stage::EnemySlot { .. }
            | Stage::AwaitAllSettled
            | Stage::RoundEndDelay(_) => TurnPhase::EnemyTurn,
            Stage::WaveSpawnTick { .. } | Stage::WaveTransition(_) => TurnPhase::WaveTransition,
            Stage::Ended(_) => TurnPhase::CombatEnded,
        }
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.stage {
            Stage::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn on_event(&mut self, event: CombatEvent) {
        match event {
            CombatEvent::FinishedActions { entity } => match self.stage {
                Stage::AwaitPlayer { player } if player == entity => {
                    self.player_finished = true;
                }
                // Only the enemy holding the active slot can finish.
                Stage::EnemySlot {
                    index,
                    started: true,
                    ..
                } if self.pass.snapshot.get(index) == Some(&entity) => {
                    self.pass.finished.insert(entity);
                }
                _ => {
                    debug!(
                        entity = entity.0,
                        stage = self.stage.name(),
                        "stale_finish_ignored"
                    );
                }
            },
            CombatEvent::Died { entity } => {
                self.pass.destroyed.insert(entity);
            }
            CombatEvent::WaveCleared { wave } => {
                self.waves_cleared = self.waves_cleared.saturating_add(1);
                self.pending_wave_clear = Some(wave);
                debug!(wave, "scheduler_saw_wave_clear");
            }
            CombatEvent::Damaged { .. } => {}
        }
    }

    pub fn update(&mut self, dt_seconds: f32, host: &mut dyn TurnHost) {
        for _ in 0..MAX_TRANSITIONS_PER_TICK {
            let before = self.stage.name();
            let flow = self.step(dt_seconds, host);
            let after = self.stage.name();
            if before != after {
                debug!(from = before, to = after, round = self.round, "turn_stage");
            }
            if matches!(flow, Flow::Yield) {
                return;
            }
        }
        warn!(stage = self.stage.name(), "turn_transition_budget_spent");
    }

    fn step(&mut self, dt_seconds: f32, host: &mut dyn TurnHost) -> Flow {
        match &mut self.stage {
            Stage::Ended(_) => Flow::Yield,
            Stage::RoundStart => {
                if !host.player_alive() {
                    return self.end(CombatOutcome::PlayerDefeated, host);
                }
                if host.living_enemies().is_empty() {
                    return self.begin_wave_transition(host);
                }
                self.round = self.round.saturating_add(1);
                host.set_phase(TurnIndicator::PlayerTurn);
                self.player_finished = false;
                match host.start_player_turn() {
                    Some(player) => {
                        info!(round = self.round, "player_turn");
                        self.stage = Stage::AwaitPlayer { player };
                        Flow::Yield
                    }
                    None => {
                        warn!(round = self.round, "player_missing");
                        self.end(CombatOutcome::PlayerDefeated, host)
                    }
                }
            }
            Stage::AwaitPlayer { .. } => {
                if !host.player_alive() {
                    return self.end(CombatOutcome::PlayerDefeated, host);
                }
                if !self.player_finished {
                    return Flow::Yield;
                }
                self.stage = Stage::InterTurnDelay(Timer::new(self.timing.turn_delay_seconds));
                Flow::Continue
            }
            Stage::InterTurnDelay(timer) => {
                timer.advance(dt_seconds);
                if !timer.is_complete() {
                    return Flow::Yield;
                }
                self.stage = Stage::EnemyPassStart;
                Flow::Continue
            }
            Stage::EnemyPassStart => {
                let living = host.living_enemies();
                if living.is_empty() {
                    return self.begin_wave_transition(host);
                }
                host.set_phase(TurnIndicator::EnemyTurn);
                info!(round = self.round, enemies = living.len(), "enemy_turn");
                self.pass = EnemyPass {
                    living_at_start: living.len(),
                    snapshot: living,
                    ..EnemyPass::default()
                };
                self.stage = Stage::EnemySlot {
                    index: 0,
                    started: false,
                    timeout: None,
                };
                Flow::Continue
            }
            Stage::EnemySlot {
                index,
                started,
                timeout,
            } => {
                if !host.player_alive() {
                    return self.end(CombatOutcome::PlayerDefeated, host);
                }
                let Some(&id) = self.pass.snapshot.get(*index) else {
                    self.stage = Stage::AwaitAllSettled;
                    return Flow::Continue;
                };

                if !*started {
                    if self.pass.is_settled(id) || !host.is_enemy_alive(id) {
                        *index += 1;
                        return Flow::Continue;
                    }
                    if !host.start_enemy_turn(id) {
                        warn!(enemy = id.0, "enemy_turn_not_started");
                        *index += 1;
                        return Flow::Continue;
                    }
                    *started = true;
                    *timeout = self.timing.turn_timeout_seconds.map(Timer::new);
                    return Flow::Yield;
                }

                if self.pass.is_settled(id) || !host.is_enemy_alive(id) {
                    *index += 1;
                    *started = false;
                    return Flow::Continue;
                }
                if let Some(timer) = timeout.as_mut() {
                    timer.advance(dt_seconds);
                    if timer.is_complete() {
                        warn!(
                            enemy = id.0,
                            waited_seconds = timer.elapsed_seconds(),
                            "enemy_turn_timed_out"
                        );
                        self.pass.timed_out.insert(id);
                        *index += 1;
                        *started = false;
                        host.abort_enemy_turn(id);
                        return Flow::Continue;
                    }
                }
                Flow::Yield
            }
            Stage::AwaitAllSettled => {
                if !host.player_alive() {
                    return self.end(CombatOutcome::PlayerDefeated, host);
                }
                let finished = self.pass.finished.len();
                let all_settled = self
                    .pass
                    .snapshot
                    .iter()
                    .all(|id| self.pass.is_settled(*id) || !host.is_enemy_alive(*id));
                let done = finished >= self.pass.living_at_start
                    || host.living_enemies().is_empty()
                    || all_settled;
                if !done {
                    return Flow::Yield;
                }
                debug!(
                    round = self.round,
                    finished,
                    expected = self.pass.living_at_start,
                    destroyed = self.pass.destroyed.len(),
                    timed_out = self.pass.timed_out.len(),
                    "enemy_pass_settled"
                );
                self.stage = Stage::RoundEndDelay(Timer::new(self.timing.turn_delay_seconds));
                Flow::Continue
            }
            Stage::RoundEndDelay(timer) => {
                timer.advance(dt_seconds);
                if !timer.is_complete() {
                    return Flow::Yield;
                }
                self.stage = Stage::RoundStart;
                Flow::Continue
            }
            Stage::WaveSpawnTick { waited } => {
                if !*waited {
                    *waited = true;
                    return Flow::Yield;
                }
                self.stage = Stage::WaveTransition(Timer::new(self.timing.wave_transition_seconds));
                Flow::Continue
            }
            Stage::WaveTransition(timer) => {
                timer.advance(dt_seconds);
                if !timer.is_complete() {
                    return Flow::Yield;
                }
                self.stage = Stage::RoundStart;
                Flow::Continue
            }
        }
    }

    /// Entered only once the field is empty. A seen wave clear is consumed
    /// here as the cause; leftover manual spawns keep a cleared wave waiting.
    fn begin_wave_transition(&mut self, host: &mut dyn TurnHost) -> Flow {
        host.set_phase(TurnIndicator::Hidden);
        let cause = match self.pending_wave_clear.take() {
            Some(_) => "wave_cleared",
            None => "empty_field",
        };
        match host.start_next_wave() {
            WaveRequest::Started { wave, spawned } if spawned > 0 => {
                info!(wave, spawned, cause, "wave_transition");
                self.stage = Stage::WaveSpawnTick { waited: false };
                Flow::Continue
            }
            WaveRequest::Started { wave, .. } => {
                warn!(wave, "wave_spawned_nothing");
                self.end(CombatOutcome::Stalled, host)
            }
            WaveRequest::Exhausted => self.end(CombatOutcome::Victory, host),
            WaveRequest::Unavailable => {
                warn!("waves_unavailable");
                self.end(CombatOutcome::Stalled, host)
            }
        }
    }

    fn end(&mut self, outcome: CombatOutcome, host: &mut dyn TurnHost) -> Flow {
        host.set_phase(TurnIndicator::Hidden);
        info!(outcome = ?outcome, round = self.round, "combat_ended");
        self.stage = Stage::Ended(outcome);
        Flow::Yield
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    /// Scripted host: enemies finish or die only when the test says so.
    #[derive(Default)]
    struct ScriptedHost {
        player_alive: bool,
        enemies: Vec<EntityId>,
        started_turns: Vec<EntityId>,
        player_turns: u32,
        waves: Vec<WaveRequest>,
        wave_calls: u32,
        phases: Vec<TurnIndicator>,
        kill_all_on_first_enemy_turn: bool,
        aborted: Vec<EntityId>,
    }

    impl TurnHost for ScriptedHost {
        fn player_alive(&self) -> bool {
            self.player_alive
        }

        fn living_enemies(&self) -> Vec<EntityId> {
            self.enemies.clone()
        }

        fn is_enemy_alive(&self, id: EntityId) -> bool {
            self.enemies.contains(&id)
        }

        fn start_player_turn(&mut self) -> Option<EntityId> {
            self.player_turns += 1;
            Some(EntityId(0))
        }

        fn start_enemy_turn(&mut self, id: EntityId) -> bool {
            self.started_turns.push(id);
            if self.kill_all_on_first_enemy_turn {
                self.enemies.clear();
            }
            true
        }

        fn abort_enemy_turn(&mut self, id: EntityId) {
            self.aborted.push(id);
        }

        fn start_next_wave(&mut self) -> WaveRequest {
            self.wave_calls += 1;
            if self.waves.is_empty() {
                WaveRequest::Unavailable
            } else {
                self.waves.remove(0)
            }
        }

        fn set_phase(&mut self, phase: TurnIndicator) {
            self.phases.push(phase);
        }
    }

    fn host_with_enemies(raw_ids: &[u64]) -> ScriptedHost {
        ScriptedHost {
            player_alive: true,
            enemies: raw_ids.iter().copied().map(EntityId).collect(),
            ..ScriptedHost::default()
        }
    }

    fn fast_timing() -> TimingSettings {
        TimingSettings {
            turn_delay_seconds: 0.2,
            wave_transition_seconds: 0.2,
            player_attack_interval_seconds: 0.0,
            turn_timeout_seconds: None,
        }
    }

    fn tick_until(
        scheduler: &mut TurnScheduler,
        host: &mut ScriptedHost,
        max_ticks: u32,
        mut done: impl FnMut(&TurnScheduler, &ScriptedHost) -> bool,
    ) -> bool {
        for _ in 0..max_ticks {
            if done(scheduler, host) {
                return true;
            }
            scheduler.update(DT, host);
        }
        done(scheduler, host)
    }

    #[test]
    fn player_acts_first_and_enemies_wait_for_finish() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1, 2]);

        scheduler.update(DT, &mut host);
        assert_eq!(scheduler.phase(), TurnPhase::PlayerTurn);
        assert_eq!(host.player_turns, 1);
        assert!(host.started_turns.is_empty());

        for _ in 0..10 {
            scheduler.update(DT, &mut host);
        }
        assert!(host.started_turns.is_empty());

        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            !host.started_turns.is_empty()
        }));
        assert_eq!(host.started_turns, vec![EntityId(1)]);
        assert_eq!(scheduler.phase(), TurnPhase::EnemyTurn);

        for _ in 0..10 {
            scheduler.update(DT, &mut host);
        }
        assert_eq!(host.started_turns, vec![EntityId(1)]);

        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(1),
        });
        scheduler.update(DT, &mut host);
        assert_eq!(host.started_turns, vec![EntityId(1), EntityId(2)]);

        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(2),
        });
        assert_eq!(scheduler.finished_this_pass(), 2);
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            host.player_turns == 2
        }));
        assert_eq!(scheduler.round(), 2);
    }

    #[test]
    fn destroyed_enemy_releases_its_slot() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1, 2]);
        scheduler.update(DT, &mut host);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            !host.started_turns.is_empty()
        }));

        host.enemies.retain(|id| *id != EntityId(1));
        scheduler.on_event(CombatEvent::Died {
            entity: EntityId(1),
        });
        scheduler.update(DT, &mut host);
        assert_eq!(host.started_turns, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn zero_living_guard_ends_enemy_pass() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1, 2]);
        host.kill_all_on_first_enemy_turn = true;
        host.waves = vec![WaveRequest::Exhausted];

        scheduler.update(DT, &mut host);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 50, |scheduler, _| {
            scheduler.outcome().is_some()
        }));
        assert_eq!(host.started_turns, vec![EntityId(1)]);
        assert_eq!(scheduler.outcome(), Some(CombatOutcome::Victory));
        assert_eq!(host.phases.last(), Some(&TurnIndicator::Hidden));
    }

    #[test]
    fn stuck_enemy_times_out() {
        let mut scheduler = TurnScheduler::new(TimingSettings {
            turn_timeout_seconds: Some(1.0),
            ..fast_timing()
        });
        let mut host = host_with_enemies(&[1, 2]);
        scheduler.update(DT, &mut host);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 50, |_, host| {
            host.started_turns.len() == 2
        }));
        assert_eq!(host.started_turns, vec![EntityId(1), EntityId(2)]);
        assert!(host.aborted.is_empty());

        assert!(tick_until(&mut scheduler, &mut host, 50, |_, host| {
            !host.aborted.is_empty()
        }));
        assert_eq!(host.aborted, vec![EntityId(2)]);
    }

    #[test]
    fn late_finish_from_timed_out_turn_does_not_skip_next_pass() {
        let mut scheduler = TurnScheduler::new(TimingSettings {
            turn_timeout_seconds: Some(1.0),
            ..fast_timing()
        });
        let mut host = host_with_enemies(&[1, 2]);
        scheduler.update(DT, &mut host);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            host.started_turns.len() == 1
        }));
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(1),
        });

        // Enemy 2 never reports in time.
        assert!(tick_until(&mut scheduler, &mut host, 50, |_, host| {
            host.player_turns == 2
        }));
        assert_eq!(host.aborted, vec![EntityId(2)]);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            host.started_turns.len() == 3
        }));

        // The abandoned turn finishes while enemy 1 holds the slot.
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(2),
        });
        assert_eq!(scheduler.finished_this_pass(), 0);
        scheduler.update(DT, &mut host);
        assert_eq!(host.started_turns.len(), 3);

        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(1),
        });
        assert!(tick_until(&mut scheduler, &mut host, 5, |_, host| {
            host.started_turns.len() == 4
        }));
        assert_eq!(
            host.started_turns,
            vec![EntityId(1), EntityId(2), EntityId(1), EntityId(2)]
        );
    }

    #[test]
    fn finish_from_enemy_without_the_slot_is_not_credited() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1, 2]);
        scheduler.update(DT, &mut host);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            host.started_turns.len() == 1
        }));
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(2),
        });
        assert_eq!(scheduler.finished_this_pass(), 0);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(1),
        });
        scheduler.update(DT, &mut host);

        assert_eq!(host.started_turns, vec![EntityId(1), EntityId(2)]);
        assert_eq!(scheduler.finished_this_pass(), 1);
    }

    #[test]
    fn wave_clear_is_held_until_the_transition_consumes_it() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1]);
        host.waves = vec![WaveRequest::Started {
            wave: 2,
            spawned: 1,
        }];
        scheduler.update(DT, &mut host);
        scheduler.on_event(CombatEvent::FinishedActions {
            entity: EntityId(0),
        });

        host.enemies.clear();
        scheduler.on_event(CombatEvent::Died {
            entity: EntityId(1),
        });
        scheduler.on_event(CombatEvent::WaveCleared { wave: 1 });
        assert_eq!(scheduler.pending_wave_clear(), Some(1));
        assert_eq!(scheduler.waves_cleared(), 1);
        assert_eq!(host.wave_calls, 0);

        assert!(tick_until(&mut scheduler, &mut host, 20, |scheduler, _| {
            scheduler.phase() == TurnPhase::WaveTransition
        }));
        assert_eq!(host.wave_calls, 1);
        assert_eq!(scheduler.pending_wave_clear(), None);
        assert!(host.started_turns.is_empty());
    }

    #[test]
    fn empty_field_requests_wave_then_waits_a_tick() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[]);
        host.waves = vec![WaveRequest::Started {
            wave: 1,
            spawned: 2,
        }];

        scheduler.update(DT, &mut host);
        assert_eq!(host.wave_calls, 1);
        assert_eq!(scheduler.phase(), TurnPhase::WaveTransition);

        host.enemies = vec![EntityId(5), EntityId(6)];
        assert!(tick_until(&mut scheduler, &mut host, 20, |_, host| {
            host.player_turns == 1
        }));
        assert_eq!(host.wave_calls, 1);
        assert_eq!(
            host.phases,
            vec![TurnIndicator::Hidden, TurnIndicator::PlayerTurn]
        );
    }

    #[test]
    fn unavailable_waves_stall_combat() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[]);
        scheduler.update(DT, &mut host);
        assert_eq!(scheduler.outcome(), Some(CombatOutcome::Stalled));
        assert_eq!(scheduler.phase(), TurnPhase::CombatEnded);
    }

    #[test]
    fn dead_player_ends_combat_at_round_start() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1]);
        host.player_alive = false;
        scheduler.update(DT, &mut host);
        assert_eq!(scheduler.outcome(), Some(CombatOutcome::PlayerDefeated));
        assert_eq!(host.player_turns, 0);
    }

    #[test]
    fn player_death_mid_turn_ends_combat() {
        let mut scheduler = TurnScheduler::new(fast_timing());
        let mut host = host_with_enemies(&[1]);
        scheduler.update(DT, &mut host);
        host.player_alive = false;
        scheduler.update(DT, &mut host);
        assert_eq!(scheduler.outcome(), Some(CombatOutcome::PlayerDefeated));
    }
}
