use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unit vector pointing from `self` to `other`, or zero when the points coincide.
    pub fn direction_to(self, other: Vec2) -> Vec2 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let len_sq = dx * dx + dy * dy;
        if len_sq <= f32::EPSILON {
            return Vec2::ZERO;
        }
        let inv_len = len_sq.sqrt().recip();
        Vec2 {
            x: dx * inv_len,
            y: dy * inv_len,
        }
    }

    pub fn offset(self, direction: Vec2, distance: f32) -> Vec2 {
        Vec2 {
            x: self.x + direction.x * distance,
            y: self.y + direction.y * distance,
        }
    }

    /// Unclamped linear interpolation; `t` outside `[0, 1]` extrapolates.
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug)]
struct StoredEntity<T> {
    id: EntityId,
    value: T,
}

/// Entity storage with deferred structural changes.
///
/// Spawns and despawns are queued and only become visible after
/// [`SceneWorld::apply_pending`], so systems iterating the live set during a
/// tick never observe it changing underneath them. Iteration order is spawn
/// order.
#[derive(Debug)]
pub struct SceneWorld<T> {
    allocator: EntityIdAllocator,
    entities: Vec<StoredEntity<T>>,
    pending_spawns: Vec<StoredEntity<T>>,
    pending_despawns: Vec<EntityId>,
}

impl<T> Default for SceneWorld<T> {
    fn default() -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            entities: Vec::new(),
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
        }
    }
}

impl<T> SceneWorld<T> {
    pub fn allocate_id(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    pub fn spawn(&mut self, value: T) -> EntityId {
        let id = self.allocator.allocate();
        self.spawn_with_id(id, value);
        id
    }

    /// Queues an entity under an id taken from [`SceneWorld::allocate_id`].
    pub fn spawn_with_id(&mut self, id: EntityId, value: T) {
        self.pending_spawns.push(StoredEntity { id, value });
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn is_pending_despawn(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    pub fn is_pending_spawn(&self, id: EntityId) -> bool {
        self.pending_spawns.iter().any(|entity| entity.id == id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_spawns.is_empty() || !self.pending_despawns.is_empty()
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            self.entities.append(&mut self.pending_spawns);
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|entity| entity.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().map(|entity| entity.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().map(|entity| (entity.id, &entity.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities
            .iter_mut()
            .map(|entity| (entity.id, &mut entity.value))
    }

    pub fn find(&self, id: EntityId) -> Option<&T> {
        self.entities
            .iter()
            .find(|entity| entity.id == id)
            .map(|entity| &entity.value)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities
            .iter_mut()
            .find(|entity| entity.id == id)
            .map(|entity| &mut entity.value)
    }
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32) -> SceneCommand;
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            is_loaded: false,
        }
    }

    pub(crate) fn load_if_needed(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load();
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        self.scene.update(fixed_dt_seconds)
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title()
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload();
            self.is_loaded = false;
        }
    }
}
