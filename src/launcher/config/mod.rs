//! Load and validate launcher configuration.
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::{launcher::readiness::Readiness, lib::errors::ConfigError};

pub mod process;
pub mod readiness;
pub mod telemetry;

pub use process::{parse_process_section, ProcessSection, RawProcessSection};
pub use readiness::{parse_readiness_section, RawReadinessSection};

pub const CONFIG_ENV_KEY: &str = "LAUNCHER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "launcher.toml";

/// Top-level configuration container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LauncherConfig {
    pub process: ProcessSection,
    pub readiness: Readiness,
    /// `None` when built from defaults.
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawLauncherConfig {
    process: Option<RawProcessSection>,
    readiness: Option<RawReadinessSection>,
}

impl LauncherConfig {
    /// Load `path` when given, otherwise fall back to built-in defaults.
    pub fn load_optional(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                telemetry::log_defaults();
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        info!(
            target: "server_launcher::config",
            path = %path.display(),
            "Starting configuration load"
        );

        let builder = config::Config::builder().add_source(config::File::from(path.clone()));
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "server_launcher::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawLauncherConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "server_launcher::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            error!(
                target: "server_launcher::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    fn from_raw(raw: RawLauncherConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let process = parse_process_section(raw.process, &path)?;
        let readiness = parse_readiness_section(raw.readiness, &path)?;

        Ok(Self {
            process,
            readiness,
            source_path: Some(path),
        })
    }

    /// Configured program, required before anything can be launched.
    pub fn require_program(&self) -> Result<PathBuf, ConfigError> {
        self.process.program.clone().ok_or_else(|| ConfigError::MissingField {
            path: self
                .source_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            field: "process.program",
        })
    }
}
