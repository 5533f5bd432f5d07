use std::collections::{HashMap, HashSet};

use engine::EntityId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatEvent {
    Damaged {
        entity: EntityId,
        amount: u32,
        hp: u32,
    },
    Died {
        entity: EntityId,
    },
    FinishedActions {
        entity: EntityId,
    },
    WaveCleared {
        wave: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatEventKind {
    Damaged,
    Died,
    FinishedActions,
    WaveCleared,
}

impl CombatEvent {
    pub fn kind(self) -> CombatEventKind {
        match self {
            Self::Damaged { .. } => CombatEventKind::Damaged,
            Self::Died { .. } => CombatEventKind::Died,
            Self::FinishedActions { .. } => CombatEventKind::FinishedActions,
            Self::WaveCleared { .. } => CombatEventKind::WaveCleared,
        }
    }

    fn subject(self) -> Option<EntityId> {
        match self {
            Self::Damaged { entity, .. }
            | Self::Died { entity }
            | Self::FinishedActions { entity } => Some(entity),
            Self::WaveCleared { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatEventCounts {
    pub damaged: u32,
    pub died: u32,
    pub finished_actions: u32,
    pub wave_cleared: u32,
}

impl CombatEventCounts {
    fn record(&mut self, kind: CombatEventKind) {
        match kind {
            CombatEventKind::Damaged => self.damaged = self.damaged.saturating_add(1),
            CombatEventKind::Died => self.died = self.died.saturating_add(1),
            CombatEventKind::FinishedActions => {
                self.finished_actions = self.finished_actions.saturating_add(1)
            }
            CombatEventKind::WaveCleared => {
                self.wave_cleared = self.wave_cleared.saturating_add(1)
            }
        }
    }
}

/// Who gets told about an entity's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    TurnScheduler,
    WaveCoordinator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub event: CombatEvent,
    pub listeners: Vec<Listener>,
}

/// Queued notification fabric with a per-entity subscription table.
///
/// Events wait in the queue until [`CombatEventBus::drain`] resolves their
/// listeners. A `Died` event is accepted at most once per entity, and
/// delivering it drops every subscription on that entity. `WaveCleared` has
/// no subject and always goes to the turn scheduler.
#[derive(Debug, Default)]
pub struct CombatEventBus {
    queued: Vec<CombatEvent>,
    subscriptions: HashMap<EntityId, Vec<Listener>>,
    died: HashSet<EntityId>,
    current_tick_counts: CombatEventCounts,
    last_tick_counts: CombatEventCounts,
}

impl CombatEventBus {
    pub fn subscribe(&mut self, entity: EntityId, listener: Listener) {
        if self.died.contains(&entity) {
            return;
        }
        let listeners = self.subscriptions.entry(entity).or_default();
        if !listeners.contains(&listener) {
            listeners.push(listener);
        }
    }

    pub fn is_subscribed(&self, entity: EntityId, listener: Listener) -> bool {
        self.subscriptions
            .get(&entity)
            .is_some_and(|listeners| listeners.contains(&listener))
    }

    pub fn has_died(&self, entity: EntityId) -> bool {
        self.died.contains(&entity)
    }

    /// Returns false when the event was rejected as a repeated death.
    pub fn emit(&mut self, event: CombatEvent) -> bool {
        if let CombatEvent::Died { entity } = event {
            if !self.died.insert(entity) {
                debug!(entity = entity.0, "duplicate_death_ignored");
                return false;
            }
        }
        self.current_tick_counts.record(event.kind());
        self.queued.push(event);
        true
    }

    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Delivery> {
        let queued = std::mem::take(&mut self.queued);
        let mut deliveries = Vec::with_capacity(queued.len());
        for event in queued {
            let listeners = match event.subject() {
                Some(entity) => {
                    let listeners = self
                        .subscriptions
                        .get(&entity)
                        .cloned()
                        .unwrap_or_default();
                    if matches!(event, CombatEvent::Died { .. }) {
                        self.subscriptions.remove(&entity);
                    }
                    listeners
                }
                None => vec![Listener::TurnScheduler],
            };
            deliveries.push(Delivery { event, listeners });
        }
        deliveries
    }

    pub fn finish_tick_rollover(&mut self) {
        self.last_tick_counts = self.current_tick_counts;
        self.current_tick_counts = CombatEventCounts::default();
    }

    pub fn last_tick_counts(&self) -> CombatEventCounts {
        self.last_tick_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_delivers_then_unsubscribes() {
        let mut bus = CombatEventBus::default();
        let enemy = EntityId(3);
        bus.subscribe(enemy, Listener::TurnScheduler);
        bus.subscribe(enemy, Listener::WaveCoordinator);
        bus.subscribe(enemy, Listener::WaveCoordinator);

        assert!(bus.emit(CombatEvent::Died { entity: enemy }));
        let deliveries = bus.drain();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(
            deliveries[0].listeners,
            vec![Listener::TurnScheduler, Listener::WaveCoordinator]
        );
        assert!(!bus.is_subscribed(enemy, Listener::TurnScheduler));
        assert!(!bus.is_subscribed(enemy, Listener::WaveCoordinator));
    }

    #[test]
    fn second_death_is_rejected() {
        let mut bus = CombatEventBus::default();
        let enemy = EntityId(1);
        assert!(bus.emit(CombatEvent::Died { entity: enemy }));
        assert!(!bus.emit(CombatEvent::Died { entity: enemy }));
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.has_died(enemy));
    }

    #[test]
    fn dead_entities_cannot_resubscribe() {
        let mut bus = CombatEventBus::default();
        let enemy = EntityId(9);
        bus.emit(CombatEvent::Died { entity: enemy });
        bus.subscribe(enemy, Listener::TurnScheduler);
        assert!(!bus.is_subscribed(enemy, Listener::TurnScheduler));
    }

    #[test]
    fn finished_actions_reach_only_subscribers() {
        let mut bus = CombatEventBus::default();
        bus.subscribe(EntityId(1), Listener::TurnScheduler);
        bus.emit(CombatEvent::FinishedActions {
            entity: EntityId(1),
        });
        bus.emit(CombatEvent::FinishedActions {
            entity: EntityId(2),
        });
        bus.emit(CombatEvent::WaveCleared { wave: 4 });

        let deliveries = bus.drain();
        assert_eq!(deliveries[0].listeners, vec![Listener::TurnScheduler]);
        assert!(deliveries[1].listeners.is_empty());
        assert_eq!(deliveries[2].listeners, vec![Listener::TurnScheduler]);
        assert!(!bus.has_queued());
    }

    #[test]
    fn rollover_publishes_counts_for_previous_tick() {
        let mut bus = CombatEventBus::default();
        bus.emit(CombatEvent::Damaged {
            entity: EntityId(1),
            amount: 3,
            hp: 7,
        });
        bus.emit(CombatEvent::Died {
            entity: EntityId(1),
        });
        bus.emit(CombatEvent::Died {
            entity: EntityId(1),
        });
        let _ = bus.drain();
        bus.finish_tick_rollover();

        let counts = bus.last_tick_counts();
        assert_eq!(counts.damaged, 1);
        assert_eq!(counts.died, 1);
        assert_eq!(counts.finished_actions, 0);

        bus.finish_tick_rollover();
        assert_eq!(bus.last_tick_counts(), CombatEventCounts::default());
    }
}
