use std::process::ExitCode;

use lanefall::app::{bootstrap, loop_runner};
use tracing::error;

fn main() -> ExitCode {
    let app = match bootstrap::build_app() {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    loop_runner::run(app)
}
