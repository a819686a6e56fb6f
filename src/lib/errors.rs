use std::{io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Required field is missing.
    #[error("Configuration file {path} is missing `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Failures while reading the launch arguments on the server side.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerArgsError {
    #[error("Missing positional argument `{name}`")]
    MissingArgument { name: &'static str },
    #[error("Port argument `{value}` is not a valid port")]
    InvalidPort { value: String },
}

/// Coarse classification of a [`LaunchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Spawn,
    InvalidOptions,
    Timeout,
    Closed,
}

/// Failures while launching a server or waiting for it to become ready.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Launch options must be a JSON object or null, got {found}")]
    InvalidOptions { found: &'static str },
    #[error("Launch options are not valid JSON: {source}")]
    OptionsJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("Server did not print `{marker}` within {waited_ms} ms")]
    ReadyTimeout { marker: String, waited_ms: u64 },
    #[error("Server error stream closed before `{marker}` was printed")]
    DiagnosticsClosed { marker: String },
    #[error("Server error stream is not piped; marker readiness needs it")]
    DiagnosticsUnavailable,
}

impl LaunchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LaunchError::Spawn { .. } => ErrorKind::Spawn,
            LaunchError::InvalidOptions { .. } | LaunchError::OptionsJson { .. } => {
                ErrorKind::InvalidOptions
            }
            LaunchError::ReadyTimeout { .. } => ErrorKind::Timeout,
            LaunchError::DiagnosticsClosed { .. } | LaunchError::DiagnosticsUnavailable => {
                ErrorKind::Closed
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// Descriptor reported by the binary when this error ends a launch.
    pub fn descriptor(&self) -> &'static ErrorDescriptor {
        match self.kind() {
            ErrorKind::Spawn => &SPAWN_FAILED_ERROR,
            ErrorKind::InvalidOptions => &INVALID_OPTIONS_ERROR,
            ErrorKind::Timeout => &READY_TIMEOUT_ERROR,
            ErrorKind::Closed => &READY_CLOSED_ERROR,
        }
    }
}

/// Structured error metadata printed by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescriptor {
    /// Error code.
    pub code: &'static str,
    /// User-facing message.
    pub message: &'static str,
    /// Recommended remediation.
    pub remediation: &'static str,
}

impl ErrorDescriptor {
    pub const fn new(code: &'static str, message: &'static str, remediation: &'static str) -> Self {
        Self {
            code,
            message,
            remediation,
        }
    }
}

pub const SPAWN_FAILED_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "spawn_failed",
    "The server program could not be started",
    "Check [process].program in launcher.toml or the program given after `--`.",
);

pub const INVALID_OPTIONS_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "invalid_options",
    "Launch options are not a JSON object",
    "Pass --options as a JSON object, for example '{\"pingTimeout\":500}'.",
);

pub const READY_TIMEOUT_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "ready_timeout",
    "The server never printed its readiness marker",
    "Make the server print the marker to stderr or raise [readiness].timeout_secs.",
);

pub const READY_CLOSED_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "ready_stream_closed",
    "The server closed its error stream before becoming ready",
    "Inspect the forwarded server output; the server most likely exited early.",
);
