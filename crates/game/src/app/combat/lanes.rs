use engine::{EntityId, Vec2};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Top,
    Middle,
    Bottom,
}

/// Order in which lanes are offered to new spawns.
pub const CANONICAL_LANE_ORDER: [Lane; 3] = [Lane::Middle, Lane::Top, Lane::Bottom];

impl Lane {
    fn slot(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Middle => 1,
            Self::Bottom => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaneSettings {
    pub spawn_x: f32,
    pub base_y: f32,
    pub spacing: f32,
    pub max_per_lane: usize,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            spawn_x: 8.0,
            base_y: 0.0,
            spacing: 1.5,
            max_per_lane: 1,
        }
    }
}

impl LaneSettings {
    pub fn position(&self, lane: Lane) -> Vec2 {
        let y = match lane {
            Lane::Top => self.base_y + self.spacing,
            Lane::Middle => self.base_y,
            Lane::Bottom => self.base_y - self.spacing,
        };
        Vec2::new(self.spawn_x, y)
    }
}

#[derive(Debug, Clone)]
pub struct LaneSpawner {
    settings: LaneSettings,
    occupants: [Vec<EntityId>; 3],
}

impl LaneSpawner {
    pub fn new(settings: LaneSettings) -> Self {
        Self {
            settings,
            occupants: Default::default(),
        }
    }

    pub fn settings(&self) -> &LaneSettings {
        &self.settings
    }

    pub fn occupants(&self, lane: Lane) -> &[EntityId] {
        &self.occupants[lane.slot()]
    }

    pub fn prune(&mut self, mut is_alive: impl FnMut(EntityId) -> bool) {
        for lane in &mut self.occupants {
            lane.retain(|id| is_alive(*id));
        }
    }

    /// First lane in canonical order with room, after dropping dead occupants.
    pub fn free_lane(&mut self, is_alive: impl FnMut(EntityId) -> bool) -> Option<(Lane, Vec2)> {
        self.prune(is_alive);
        CANONICAL_LANE_ORDER
            .into_iter()
            .find(|lane| self.occupants[lane.slot()].len() < self.settings.max_per_lane)
            .map(|lane| (lane, self.settings.position(lane)))
    }

    pub fn occupy(&mut self, lane: Lane, id: EntityId) {
        self.occupants[lane.slot()].push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner(max_per_lane: usize) -> LaneSpawner {
        LaneSpawner::new(LaneSettings {
            max_per_lane,
            ..LaneSettings::default()
        })
    }

    #[test]
    fn lanes_fill_in_canonical_order() {
        let mut lanes = spawner(1);
        let mut picked = Vec::new();
        for raw in 0..3 {
            let (lane, _) = lanes.free_lane(|_| true).expect("room left");
            lanes.occupy(lane, EntityId(raw));
            picked.push(lane);
        }
        assert_eq!(picked, vec![Lane::Middle, Lane::Top, Lane::Bottom]);
        assert!(lanes.free_lane(|_| true).is_none());
    }

    #[test]
    fn dead_occupants_free_their_lane() {
        let mut lanes = spawner(1);
        lanes.occupy(Lane::Middle, EntityId(1));
        lanes.occupy(Lane::Top, EntityId(2));

        let (lane, _) = lanes.free_lane(|_| true).expect("bottom free");
        assert_eq!(lane, Lane::Bottom);

        let (lane, _) = lanes
            .free_lane(|id| id != EntityId(1))
            .expect("middle reopened");
        assert_eq!(lane, Lane::Middle);
        assert!(lanes.occupants(Lane::Middle).is_empty());
    }

    #[test]
    fn zero_capacity_never_admits() {
        let mut lanes = spawner(0);
        assert!(lanes.free_lane(|_| true).is_none());
    }

    #[test]
    fn lane_positions_stack_around_base() {
        let settings = LaneSettings {
            spawn_x: 5.0,
            base_y: 1.0,
            spacing: 2.0,
            max_per_lane: 1,
        };
        assert_eq!(settings.position(Lane::Top), Vec2::new(5.0, 3.0));
        assert_eq!(settings.position(Lane::Middle), Vec2::new(5.0, 1.0));
        assert_eq!(settings.position(Lane::Bottom), Vec2::new(5.0, -1.0));
    }
}
