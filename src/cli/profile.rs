//! LaunchProfile and config/readiness resolution.
use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::launcher::{
    config::{CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH},
    readiness::{FixedDelay, MarkerScan, Readiness, DEFAULT_READY_DELAY},
    LaunchRequest,
};

/// Readiness strategy selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ReadinessMode {
    Delay,
    Marker,
}

impl ReadinessMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReadinessMode::Delay => "delay",
            ReadinessMode::Marker => "marker",
        }
    }
}

/// Readiness settings given on the command line; unset fields keep the config value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessOverrides {
    pub mode: Option<ReadinessMode>,
    pub delay_ms: Option<u64>,
    pub marker: Option<String>,
    /// `0` waits forever.
    pub timeout_secs: Option<u64>,
}

impl ReadinessOverrides {
    pub fn apply(&self, base: Readiness) -> Readiness {
        let mode = self.mode.unwrap_or(match base {
            Readiness::FixedDelay(_) => ReadinessMode::Delay,
            Readiness::Marker(_) => ReadinessMode::Marker,
        });

        match (mode, base) {
            (ReadinessMode::Delay, base) => {
                let inherited = match base {
                    Readiness::FixedDelay(delay) => delay.delay,
                    Readiness::Marker(_) => DEFAULT_READY_DELAY,
                };
                Readiness::FixedDelay(FixedDelay {
                    delay: self.delay_ms.map(Duration::from_millis).unwrap_or(inherited),
                })
            }
            (ReadinessMode::Marker, base) => {
                let mut scan = match base {
                    Readiness::Marker(scan) => scan,
                    Readiness::FixedDelay(_) => MarkerScan::default(),
                };
                if let Some(marker) = self.marker.as_ref().filter(|m| !m.is_empty()) {
                    scan.marker = marker.clone();
                }
                match self.timeout_secs {
                    Some(0) => scan.timeout = None,
                    Some(secs) => scan.timeout = Some(Duration::from_secs(secs)),
                    None => {}
                }
                Readiness::Marker(scan)
            }
        }
    }
}

/// Resolved launch profile.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    pub config_path: Option<PathBuf>,
    pub request: LaunchRequest,
    pub readiness: ReadinessOverrides,
    /// Program and prefix args given after `--`; empty means use the config.
    pub program: Vec<String>,
    pub launch_args: Vec<String>,
}

/// Resolve config path in the order: CLI override → env var → `launcher.toml` if present.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    let explicit = override_path.or_else(|| {
        env::var_os(CONFIG_ENV_KEY)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });

    let path = match explicit {
        Some(path) => path,
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(None);
            }
            default
        }
    };

    if path.is_absolute() {
        return Ok(Some(path));
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok(Some(cwd.join(path)))
}

/// Build launch arguments suitable for reproduction/logging.
pub fn build_launch_args(
    config_path: Option<&PathBuf>,
    request: &LaunchRequest,
    readiness: &ReadinessOverrides,
) -> Vec<String> {
    let mut args = vec![format!("--profile={}", request.profile)];
    if let Some(path) = config_path {
        args.push(format!("--config={}", path.display()));
    }
    if let Some(mode) = readiness.mode {
        args.push(format!("--readiness={}", mode.as_str()));
    }
    args
}
