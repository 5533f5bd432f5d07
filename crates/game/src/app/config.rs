use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::{LoopConfig, Pacing, Vec2};
use serde::Deserialize;
use thiserror::Error;

use super::combat::{
    default_unit_thresholds, CatalogEntry, CombatantStats, EnemyKind, LaneSettings, MeleeParams,
    RangedParams, TimingSettings, UnitTemplate, UnitThreshold, WaveMode,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read match config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse match config at {field}: {source}")]
    Parse {
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid match config at {field}: {message}")]
    Invalid { field: String, message: String },
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerSettings {
    pub stats: CombatantStats,
    pub position: Vec2,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            stats: CombatantStats {
                max_hp: 100,
                attack_damage: 10,
                attack_speed: 1.0,
            },
            position: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaveSettings {
    /// With waves disabled nothing replaces a cleared field and combat stalls.
    pub enabled: bool,
    pub mode: WaveMode,
    pub catalog: Vec<CatalogEntry>,
    pub unit_thresholds: Vec<UnitThreshold>,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: WaveMode::Infinite,
            catalog: vec![
                CatalogEntry {
                    template: "grunt".to_string(),
                    spawn_chance: 0.6,
                },
                CatalogEntry {
                    template: "archer".to_string(),
                    spawn_chance: 0.4,
                },
                CatalogEntry {
                    template: "brute".to_string(),
                    spawn_chance: 0.2,
                },
            ],
            unit_thresholds: default_unit_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSettings {
    pub ticks_per_second: u32,
    /// Hard stop for headless runs; `None` runs until combat ends.
    pub max_ticks: Option<u64>,
    pub real_time: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            max_ticks: Some(60 * 60 * 60),
            real_time: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub player: PlayerSettings,
    pub templates: Vec<UnitTemplate>,
    pub waves: WaveSettings,
    pub lanes: LaneSettings,
    pub timing: TimingSettings,
    pub rng_seed: u64,
    pub host: HostSettings,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            player: PlayerSettings::default(),
            templates: default_templates(),
            waves: WaveSettings::default(),
            lanes: LaneSettings::default(),
            timing: TimingSettings::default(),
            rng_seed: 0x5eed,
            host: HostSettings::default(),
        }
    }
}

fn default_templates() -> Vec<UnitTemplate> {
    vec![
        UnitTemplate {
            name: "grunt".to_string(),
            stats: CombatantStats {
                max_hp: 30,
                attack_damage: 6,
                attack_speed: 1.0,
            },
            behavior: EnemyKind::Melee(MeleeParams::default()),
        },
        UnitTemplate {
            name: "archer".to_string(),
            stats: CombatantStats {
                max_hp: 20,
                attack_damage: 2,
                attack_speed: 2.0,
            },
            behavior: EnemyKind::Ranged(RangedParams::default()),
        },
        UnitTemplate {
            name: "brute".to_string(),
            stats: CombatantStats {
                max_hp: 50,
                attack_damage: 9,
                attack_speed: 1.0,
            },
            behavior: EnemyKind::Default,
        },
    ]
}

impl MatchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: MatchConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let path = error.path().to_string();
                let field = if path.is_empty() { ".".to_string() } else { path };
                ConfigError::Parse {
                    field,
                    source: error.into_inner(),
                }
            },
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_stats("player.stats", &self.player.stats)?;

        let mut names = HashSet::new();
        for (index, template) in self.templates.iter().enumerate() {
            if template.name.trim().is_empty() {
                return Err(invalid(format!("templates[{index}].name"), "must not be empty"));
            }
            if !names.insert(template.name.as_str()) {
                return Err(invalid(
                    format!("templates[{index}].name"),
                    format!("duplicate template '{}'", template.name),
                ));
            }
            validate_stats(&format!("templates[{index}].stats"), &template.stats)?;
            validate_behavior(&format!("templates[{index}].behavior"), &template.behavior)?;
        }

        if self.waves.enabled && self.waves.catalog.is_empty() {
            return Err(invalid("waves.catalog", "must list at least one template"));
        }
        for (index, entry) in self.waves.catalog.iter().enumerate() {
            if !names.contains(entry.template.as_str()) {
                return Err(invalid(
                    format!("waves.catalog[{index}].template"),
                    format!("unknown template '{}'", entry.template),
                ));
            }
            if !(0.0..=1.0).contains(&entry.spawn_chance) {
                return Err(invalid(
                    format!("waves.catalog[{index}].spawn_chance"),
                    format!("expected a value in [0, 1], got {}", entry.spawn_chance),
                ));
            }
        }

        let thresholds = &self.waves.unit_thresholds;
        match thresholds.first() {
            None => return Err(invalid("waves.unit_thresholds", "must not be empty")),
            Some(first) if first.from_wave != 1 => {
                return Err(invalid(
                    "waves.unit_thresholds[0].from_wave",
                    format!("expected 1, got {}", first.from_wave),
                ))
            }
            Some(_) => {}
        }
        for (index, pair) in thresholds.windows(2).enumerate() {
            if pair[1].from_wave <= pair[0].from_wave {
                return Err(invalid(
                    format!("waves.unit_thresholds[{}].from_wave", index + 1),
                    "thresholds must increase strictly",
                ));
            }
        }
        for (index, threshold) in thresholds.iter().enumerate() {
            if threshold.units == 0 {
                return Err(invalid(
                    format!("waves.unit_thresholds[{index}].units"),
                    "must be positive",
                ));
            }
        }

        if self.lanes.max_per_lane == 0 {
            return Err(invalid("lanes.max_per_lane", "must be positive"));
        }

        validate_seconds("timing.turn_delay_seconds", self.timing.turn_delay_seconds)?;
        validate_seconds(
            "timing.wave_transition_seconds",
            self.timing.wave_transition_seconds,
        )?;
        validate_seconds(
            "timing.player_attack_interval_seconds",
            self.timing.player_attack_interval_seconds,
        )?;
        if let Some(timeout) = self.timing.turn_timeout_seconds {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(invalid(
                    "timing.turn_timeout_seconds",
                    format!("expected a positive number of seconds, got {timeout}"),
                ));
            }
        }

        if self.host.ticks_per_second == 0 {
            return Err(invalid("host.ticks_per_second", "must be positive"));
        }
        Ok(())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            target_tps: self.host.ticks_per_second,
            pacing: if self.host.real_time {
                Pacing::RealTime
            } else {
                Pacing::Unpaced
            },
            max_ticks: self.host.max_ticks,
            metrics_log_interval: Duration::from_secs(5),
            ..LoopConfig::default()
        }
    }
}

fn validate_stats(field: &str, stats: &CombatantStats) -> Result<(), ConfigError> {
    if stats.max_hp == 0 {
        return Err(invalid(format!("{field}.max_hp"), "must be positive"));
    }
    if !stats.attack_speed.is_finite() || stats.attack_speed < 0.0 {
        return Err(invalid(
            format!("{field}.attack_speed"),
            format!("expected a non-negative number, got {}", stats.attack_speed),
        ));
    }
    Ok(())
}

fn validate_behavior(field: &str, behavior: &EnemyKind) -> Result<(), ConfigError> {
    match behavior {
        EnemyKind::Melee(params) => {
            validate_non_negative(&format!("{field}.move_speed"), params.move_speed)?;
            validate_non_negative(&format!("{field}.attack_range"), params.attack_range)?;
            validate_seconds(&format!("{field}.advance_seconds"), params.advance_seconds)?;
            validate_seconds(
                &format!("{field}.attack_delay_seconds"),
                params.attack_delay_seconds,
            )?;
            validate_seconds(&format!("{field}.entrance_seconds"), params.entrance_seconds)?;
        }
        EnemyKind::Ranged(params) => {
            validate_non_negative(
                &format!("{field}.entrance_distance"),
                params.entrance_distance,
            )?;
            validate_seconds(&format!("{field}.entrance_seconds"), params.entrance_seconds)?;
            validate_seconds(
                &format!("{field}.projectile_seconds"),
                params.projectile_seconds,
            )?;
            validate_non_negative(&format!("{field}.arc_height"), params.arc_height)?;
            let offset = params.fire_offset;
            if !offset.x.is_finite() || !offset.y.is_finite() {
                return Err(invalid(
                    format!("{field}.fire_offset"),
                    format!("expected finite coordinates, got ({}, {})", offset.x, offset.y),
                ));
            }
        }
        EnemyKind::Default => {}
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(
            field,
            format!("expected a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

fn validate_seconds(field: &str, seconds: f32) -> Result<(), ConfigError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid(
            field,
            format!("expected a non-negative number of seconds, got {seconds}"),
        ));
    }
    Ok(())
}
