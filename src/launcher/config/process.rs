use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::lib::{errors::ConfigError, port::DEFAULT_PORT_RANGE};

/// How the server process is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSection {
    pub program: Option<PathBuf>,
    /// Arguments placed before the positional launch arguments.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub port_range: Range<u16>,
    pub kill_on_drop: bool,
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            working_dir: None,
            port_range: DEFAULT_PORT_RANGE,
            kill_on_drop: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawProcessSection {
    pub program: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub working_dir: Option<PathBuf>,
    pub port_range: Option<Vec<u16>>,
    pub kill_on_drop: Option<bool>,
}

pub fn parse_process_section(
    raw: Option<RawProcessSection>,
    path: &Path,
) -> Result<ProcessSection, ConfigError> {
    let raw = raw.unwrap_or_default();
    let defaults = ProcessSection::default();

    let program = match raw.program {
        Some(program) if program.as_os_str().is_empty() => {
            return Err(ConfigError::InvalidField {
                path: path.to_path_buf(),
                field: "process.program",
                message: "program must not be empty".into(),
            })
        }
        other => other,
    };

    let working_dir = raw
        .working_dir
        .map(|dir| resolve_relative_to_config(dir, path));

    let port_range = match raw.port_range {
        Some(bounds) => validate_port_range(&bounds, path)?,
        None => defaults.port_range,
    };

    Ok(ProcessSection {
        program,
        args: raw.args.unwrap_or_default(),
        working_dir,
        port_range,
        kill_on_drop: raw.kill_on_drop.unwrap_or(defaults.kill_on_drop),
    })
}

fn resolve_relative_to_config(dir: PathBuf, config_path: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir;
    }
    match config_path.parent() {
        Some(parent) => parent.join(dir),
        None => dir,
    }
}

fn validate_port_range(bounds: &[u16], path: &Path) -> Result<Range<u16>, ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "process.port_range",
        message: message.into(),
    };

    let [start, end] = bounds else {
        return Err(invalid("expected [start, end]"));
    };
    if *start == 0 {
        return Err(invalid("start must be at least 1"));
    }
    if start >= end {
        return Err(invalid("start must be below end (end is exclusive)"));
    }
    Ok(*start..*end)
}
