use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombatantStats {
    pub max_hp: u32,
    pub attack_damage: u32,
    /// Attacks per turn; only the whole part counts.
    pub attack_speed: f32,
}

impl Default for CombatantStats {
    fn default() -> Self {
        Self {
            max_hp: 100,
            attack_damage: 8,
            attack_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target was already dead; nothing changed.
    Ignored,
    Wounded { hp: u32 },
    Killed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    max_hp: u32,
    current_hp: u32,
    attack_damage: u32,
    attack_speed: f32,
    dead: bool,
}

impl Combatant {
    pub fn new(stats: CombatantStats) -> Self {
        let max_hp = stats.max_hp.max(1);
        Self {
            max_hp,
            current_hp: max_hp,
            attack_damage: stats.attack_damage,
            attack_speed: stats.attack_speed,
            dead: false,
        }
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn current_hp(&self) -> u32 {
        self.current_hp
    }

    pub fn attack_damage(&self) -> u32 {
        self.attack_damage
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    pub fn attacks_per_turn(&self) -> u32 {
        attacks_for_speed(self.attack_speed)
    }

    /// Reports [`DamageOutcome::Killed`] exactly once, on the hit that brings HP to zero.
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.dead {
            return DamageOutcome::Ignored;
        }
        self.current_hp = self.current_hp.saturating_sub(amount);
        if self.current_hp == 0 {
            self.dead = true;
            return DamageOutcome::Killed;
        }
        DamageOutcome::Wounded {
            hp: self.current_hp,
        }
    }

    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.dead {
            self.current_hp = self.current_hp.saturating_add(amount).min(self.max_hp);
        }
        self.current_hp
    }
}

pub fn attacks_for_speed(attack_speed: f32) -> u32 {
    if !attack_speed.is_finite() || attack_speed <= 0.0 {
        return 0;
    }
    attack_speed.floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combatant(max_hp: u32, attack_speed: f32) -> Combatant {
        Combatant::new(CombatantStats {
            max_hp,
            attack_damage: 5,
            attack_speed,
        })
    }

    #[test]
    fn death_is_reported_exactly_once() {
        let mut unit = combatant(10, 1.0);
        assert_eq!(unit.take_damage(4), DamageOutcome::Wounded { hp: 6 });
        assert_eq!(unit.take_damage(20), DamageOutcome::Killed);
        assert_eq!(unit.take_damage(20), DamageOutcome::Ignored);
        assert_eq!(unit.take_damage(1), DamageOutcome::Ignored);
        assert!(!unit.is_alive());
        assert_eq!(unit.current_hp(), 0);
    }

    #[test]
    fn exact_lethal_hit_kills() {
        let mut unit = combatant(10, 1.0);
        assert_eq!(unit.take_damage(10), DamageOutcome::Killed);
    }

    #[test]
    fn heal_clamps_to_max() {
        let mut unit = combatant(100, 1.0);
        unit.take_damage(95);
        assert_eq!(unit.current_hp(), 5);
        assert_eq!(unit.heal(200), 100);
    }

    #[test]
    fn heal_does_not_revive() {
        let mut unit = combatant(10, 1.0);
        unit.take_damage(10);
        assert_eq!(unit.heal(5), 0);
        assert!(!unit.is_alive());
    }

    #[test]
    fn attacks_per_turn_floors_speed() {
        assert_eq!(combatant(10, 1.9).attacks_per_turn(), 1);
        assert_eq!(combatant(10, 2.0).attacks_per_turn(), 2);
        assert_eq!(combatant(10, 0.5).attacks_per_turn(), 0);
        assert_eq!(attacks_for_speed(f32::NAN), 0);
        assert_eq!(attacks_for_speed(-3.0), 0);
    }

    #[test]
    fn spawns_at_full_hp() {
        let unit = combatant(42, 1.0);
        assert_eq!(unit.current_hp(), 42);
        assert_eq!(unit.max_hp(), 42);
        assert!(unit.is_alive());
    }
}
