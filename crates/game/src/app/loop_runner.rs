use std::process::ExitCode;

use engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub fn run(app: AppWiring) -> ExitCode {
    match run_app(app.config, app.scene) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                simulated_seconds = summary.simulated_seconds,
                wall_seconds = summary.wall_seconds,
                average_tps = summary.average_tps(),
                "run_complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}
