use serde_json::{Map, Value};

use crate::lib::errors::LaunchError;

pub const DEFAULT_PROFILE: &str = "default";

/// JSON object handed to the server as its third argument.
pub type LaunchOptions = Map<String, Value>;

/// Normalized inputs for one launch.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub profile: String,
    pub options: LaunchOptions,
}

impl Default for LaunchRequest {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            options: LaunchOptions::new(),
        }
    }
}

impl LaunchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request for `profile` with empty options.
    pub fn for_profile(profile: impl Into<String>) -> Self {
        Self::default().with_profile(profile)
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_options(mut self, options: LaunchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Replace options from an arbitrary JSON value. `null` means no options.
    pub fn with_options_value(self, value: Value) -> Result<Self, LaunchError> {
        let options = options_from_value(value)?;
        Ok(self.with_options(options))
    }

    /// Replace options from raw JSON text, as given on the command line.
    pub fn with_options_json(self, raw: &str) -> Result<Self, LaunchError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|source| LaunchError::OptionsJson { source })?;
        self.with_options_value(value)
    }

    /// Options serialized the way the server receives them.
    pub fn options_json(&self) -> Result<String, LaunchError> {
        serde_json::to_string(&self.options).map_err(|source| LaunchError::OptionsJson { source })
    }
}

/// Normalize a JSON value into launch options.
pub fn options_from_value(value: Value) -> Result<LaunchOptions, LaunchError> {
    match value {
        Value::Null => Ok(LaunchOptions::new()),
        Value::Object(map) => Ok(map),
        Value::Bool(_) => Err(LaunchError::InvalidOptions { found: "a boolean" }),
        Value::Number(_) => Err(LaunchError::InvalidOptions { found: "a number" }),
        Value::String(_) => Err(LaunchError::InvalidOptions { found: "a string" }),
        Value::Array(_) => Err(LaunchError::InvalidOptions { found: "an array" }),
    }
}
