use engine::EntityId;

use super::presentation::Effect;

/// Deferred world mutation produced by actions and applied at the resolution point of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatIntent {
    ApplyDamage {
        source: EntityId,
        target: EntityId,
        amount: u32,
    },
    PlayEffect(Effect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatIntentKind {
    ApplyDamage,
    PlayEffect,
}

impl CombatIntent {
    pub fn kind(self) -> CombatIntentKind {
        match self {
            Self::ApplyDamage { .. } => CombatIntentKind::ApplyDamage,
            Self::PlayEffect(_) => CombatIntentKind::PlayEffect,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatIntentApplyStats {
    pub total: u32,
    pub apply_damage: u32,
    pub play_effect: u32,
    pub invalid_target_count: u32,
    pub kills: u32,
}

impl CombatIntentApplyStats {
    pub(crate) fn record_intent(&mut self, kind: CombatIntentKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            CombatIntentKind::ApplyDamage => self.apply_damage = self.apply_damage.saturating_add(1),
            CombatIntentKind::PlayEffect => self.play_effect = self.play_effect.saturating_add(1),
        }
    }

    pub(crate) fn record_invalid_target(&mut self) {
        self.invalid_target_count = self.invalid_target_count.saturating_add(1);
    }

    pub(crate) fn record_kill(&mut self) {
        self.kills = self.kills.saturating_add(1);
    }
}

#[derive(Debug, Default)]
pub struct CombatIntentQueue {
    intents: Vec<CombatIntent>,
    last_tick_apply_stats: CombatIntentApplyStats,
}

impl CombatIntentQueue {
    pub fn enqueue(&mut self, intent: CombatIntent) {
        self.intents.push(intent);
    }

    pub fn damage(&mut self, source: EntityId, target: EntityId, amount: u32) {
        self.enqueue(CombatIntent::ApplyDamage {
            source,
            target,
            amount,
        });
    }

    pub fn effect(&mut self, effect: Effect) {
        self.enqueue(CombatIntent::PlayEffect(effect));
    }

    pub fn pending(&self) -> &[CombatIntent] {
        &self.intents
    }

    pub fn drain_current_tick(&mut self) -> Vec<CombatIntent> {
        std::mem::take(&mut self.intents)
    }

    pub fn set_last_tick_apply_stats(&mut self, stats: CombatIntentApplyStats) {
        self.last_tick_apply_stats = stats;
    }

    pub fn last_tick_apply_stats(&self) -> CombatIntentApplyStats {
        self.last_tick_apply_stats
    }
}
