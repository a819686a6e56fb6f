use tracing::{debug, info};

use super::{LauncherConfig, CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH};
use crate::launcher::readiness::AwaitReady;

pub fn log_defaults() {
    debug!(
        target: "server_launcher::config",
        env = CONFIG_ENV_KEY,
        default = DEFAULT_CONFIG_PATH,
        "No configuration file found; using built-in defaults"
    );
}

pub fn log_loaded(config: &LauncherConfig) {
    info!(
        target: "server_launcher::config",
        path = ?config.source_path,
        program = ?config.process.program,
        prefix_args = config.process.args.len(),
        port_start = config.process.port_range.start,
        port_end = config.process.port_range.end,
        readiness = config.readiness.name(),
        "Configuration file loaded successfully"
    );
}
