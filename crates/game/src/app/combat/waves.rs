use std::collections::HashSet;

use engine::{EntityId, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::events::CombatEvent;
use super::lanes::{Lane, LaneSettings, LaneSpawner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaveMode {
    Infinite,
    Level { max_waves: u32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub template: String,
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f32,
}

fn default_spawn_chance() -> f32 {
    1.0
}

/// From `from_wave` onward each wave has `units` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitThreshold {
    pub from_wave: u32,
    pub units: u32,
}

pub fn default_unit_thresholds() -> Vec<UnitThreshold> {
    vec![
        UnitThreshold {
            from_wave: 1,
            units: 1,
        },
        UnitThreshold {
            from_wave: 4,
            units: 2,
        },
        UnitThreshold {
            from_wave: 7,
            units: 3,
        },
    ]
}

pub fn units_for_wave(thresholds: &[UnitThreshold], wave: u32) -> u32 {
    thresholds
        .iter()
        .rev()
        .find(|threshold| threshold.from_wave <= wave)
        .or_else(|| thresholds.first())
        .map_or(0, |threshold| threshold.units)
}

/// Where the coordinator materializes enemies.
pub trait SpawnSurface {
    fn spawn_at(&mut self, template: &str, lane: Lane, position: Vec2) -> Option<EntityId>;
    fn is_alive(&self, id: EntityId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveStart {
    pub wave: u32,
    pub requested: Vec<String>,
    pub spawned: Vec<EntityId>,
}

#[derive(Debug)]
pub struct WaveCoordinator {
    mode: WaveMode,
    catalog: Vec<CatalogEntry>,
    thresholds: Vec<UnitThreshold>,
    lanes: LaneSpawner,
    rng: StdRng,
    wave: u32,
    alive: HashSet<EntityId>,
    clear_signalled: bool,
}

impl WaveCoordinator {
    pub fn new(
        mode: WaveMode,
        catalog: Vec<CatalogEntry>,
        thresholds: Vec<UnitThreshold>,
        lane_settings: LaneSettings,
        rng_seed: u64,
    ) -> Self {
        Self {
            mode,
            catalog,
            thresholds,
            lanes: LaneSpawner::new(lane_settings),
            rng: StdRng::seed_from_u64(rng_seed),
            wave: 0,
            alive: HashSet::new(),
            clear_signalled: false,
        }
    }

    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn mode(&self) -> WaveMode {
        self.mode
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    pub fn lanes(&self) -> &LaneSpawner {
        &self.lanes
    }

    pub fn has_next_wave(&self) -> bool {
        match self.mode {
            WaveMode::Infinite => true,
            WaveMode::Level { max_waves } => self.wave < max_waves,
        }
    }

    /// Advances the wave counter and spawns its units.
    ///
    /// Returns `None` once a level has run out of waves; the counter is left
    /// untouched in that case.
    pub fn start_next_wave(&mut self, surface: &mut dyn SpawnSurface) -> Option<WaveStart> {
        if !self.has_next_wave() {
            info!(wave = self.wave, "waves_exhausted");
            return None;
        }
        self.wave = self.wave.saturating_add(1);
        self.alive.clear();
        self.clear_signalled = false;

        let slots = units_for_wave(&self.thresholds, self.wave);
        let mut requested = Vec::with_capacity(slots as usize);
        let mut spawned = Vec::with_capacity(slots as usize);
        for slot in 0..slots {
            let Some(template) = self.draw_template() else {
                warn!(wave = self.wave, "wave_catalog_empty");
                break;
            };
            requested.push(template.clone());
            match self.spawn_enemy(&template, surface) {
                Some(id) => spawned.push(id),
                None => debug!(
                    wave = self.wave,
                    slot,
                    template = template.as_str(),
                    "wave_slot_skipped"
                ),
            }
        }

        info!(
            wave = self.wave,
            slots,
            spawned = spawned.len(),
            "wave_started"
        );
        Some(WaveStart {
            wave: self.wave,
            requested,
            spawned,
        })
    }

    /// Places one enemy in the first lane with room. `None` when every lane is full.
    pub fn spawn_enemy(
        &mut self,
        template: &str,
        surface: &mut dyn SpawnSurface,
    ) -> Option<EntityId> {
        let Some((lane, position)) = self.lanes.free_lane(|id| surface.is_alive(id)) else {
            warn!(template, "lanes_full");
            return None;
        };
        let id = surface.spawn_at(template, lane, position)?;
        self.lanes.occupy(lane, id);
        self.alive.insert(id);
        Some(id)
    }

    /// Returns the wave-clear notification when `id` was the last tracked enemy.
    pub fn on_enemy_died(&mut self, id: EntityId) -> Option<CombatEvent> {
        if !self.alive.remove(&id) {
            return None;
        }
        if !self.alive.is_empty() || self.clear_signalled {
            return None;
        }
        self.clear_signalled = true;
        info!(wave = self.wave, "wave_cleared");
        Some(CombatEvent::WaveCleared { wave: self.wave })
    }

    fn draw_template(&mut self) -> Option<String> {
        if self.catalog.is_empty() {
            return None;
        }
        let passed: Vec<usize> = (0..self.catalog.len())
            .filter(|&index| self.rng.random::<f32>() < self.catalog[index].spawn_chance)
            .collect();
        let index = if passed.is_empty() {
            self.rng.random_range(0..self.catalog.len())
        } else {
            passed[self.rng.random_range(0..passed.len())]
        };
        Some(self.catalog[index].template.clone())
    }
}
