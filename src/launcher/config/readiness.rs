use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    launcher::readiness::{
        FixedDelay, MarkerScan, Readiness, DEFAULT_MARKER, DEFAULT_READY_DELAY,
        DEFAULT_READY_TIMEOUT,
    },
    lib::errors::ConfigError,
};

#[derive(Debug, Deserialize, Default)]
pub struct RawReadinessSection {
    pub strategy: Option<String>,
    pub marker: Option<String>,
    pub delay_ms: Option<u64>,
    /// `0` waits forever.
    pub timeout_secs: Option<u64>,
}

pub fn parse_readiness_section(
    raw: Option<RawReadinessSection>,
    path: &Path,
) -> Result<Readiness, ConfigError> {
    let raw = raw.unwrap_or_default();
    match raw.strategy.as_deref().unwrap_or("marker") {
        "marker" => {
            let marker = raw.marker.unwrap_or_else(|| DEFAULT_MARKER.to_string());
            if marker.is_empty() {
                return Err(ConfigError::InvalidField {
                    path: path.to_path_buf(),
                    field: "readiness.marker",
                    message: "marker must not be empty".into(),
                });
            }
            let timeout = match raw.timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => Some(DEFAULT_READY_TIMEOUT),
            };
            Ok(Readiness::Marker(MarkerScan { marker, timeout }))
        }
        "delay" => {
            let delay = raw
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_READY_DELAY);
            Ok(Readiness::FixedDelay(FixedDelay { delay }))
        }
        other => Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "readiness.strategy",
            message: format!("expected `marker` or `delay`, got `{other}`"),
        }),
    }
}
