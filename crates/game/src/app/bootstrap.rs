use std::path::PathBuf;

use engine::{LoopConfig, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::combat::{CombatScene, TracingPresentation};
use super::config::{ConfigError, MatchConfig};

pub const CONFIG_ENV_VAR: &str = "LANEFALL_CONFIG";

pub struct AppWiring {
    pub config: LoopConfig,
    pub scene: Box<dyn Scene>,
}

/// Installs logging, reads the match config and builds the scene to run.
///
/// The config path comes from the first CLI argument, then `LANEFALL_CONFIG`.
/// Without either the built-in defaults are used.
pub fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "lanefall_startup");

    let path = resolve_config_path(
        std::env::args().nth(1),
        std::env::var(CONFIG_ENV_VAR).ok(),
    );
    let match_config = match path {
        Some(path) => {
            info!(path = %path.display(), "config_loading");
            MatchConfig::load(&path)?
        }
        None => {
            info!("config_defaults");
            MatchConfig::default()
        }
    };
    Ok(wire(&match_config))
}

pub fn wire(match_config: &MatchConfig) -> AppWiring {
    let scene = CombatScene::new(match_config, Box::new(TracingPresentation::default()));
    AppWiring {
        config: match_config.loop_config(),
        scene: Box::new(scene),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_config_path(cli_arg: Option<String>, env_value: Option<String>) -> Option<PathBuf> {
    [cli_arg, env_value]
        .into_iter()
        .flatten()
        .map(|raw| raw.trim().to_string())
        .find(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins_over_environment() {
        let path = resolve_config_path(Some("cli.json".into()), Some("env.json".into()));
        assert_eq!(path, Some(PathBuf::from("cli.json")));
    }

    #[test]
    fn blank_values_fall_through() {
        assert_eq!(
            resolve_config_path(Some("  ".into()), Some("env.json".into())),
            Some(PathBuf::from("env.json"))
        );
        assert_eq!(resolve_config_path(None, Some(String::new())), None);
        assert_eq!(resolve_config_path(None, None), None);
    }

    #[test]
    fn wiring_carries_host_settings_into_loop_config() {
        let mut match_config = MatchConfig::default();
        match_config.host.ticks_per_second = 30;
        match_config.host.max_ticks = Some(42);

        let app = wire(&match_config);
        assert_eq!(app.config.target_tps, 30);
        assert_eq!(app.config.max_ticks, Some(42));
        assert!(app.scene.debug_title().is_some());
    }
}
