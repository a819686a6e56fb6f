//! Server side of the launch contract: `<port> <profile> <options-json>`.

use serde_json::{Map, Number, Value};

use crate::lib::errors::ServerArgsError;

/// Positional launch arguments as received by a spawned server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerArgs {
    pub port: u16,
    pub profile: String,
    /// `None` when the options argument is not a JSON object.
    pub options: Option<Map<String, Value>>,
}

impl ServerArgs {
    /// Parse the three positional arguments, program name excluded.
    pub fn parse<I, S>(args: I) -> Result<Self, ServerArgsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let raw_port = args
            .next()
            .ok_or(ServerArgsError::MissingArgument { name: "port" })?;
        let port = raw_port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| ServerArgsError::InvalidPort {
                value: raw_port.clone(),
            })?;
        let profile = args
            .next()
            .ok_or(ServerArgsError::MissingArgument { name: "profile" })?;
        let options = args.next().and_then(|raw| parse_options(&raw));

        Ok(Self {
            port,
            profile,
            options,
        })
    }
}

/// Parse an options argument. Whole-number floats become integers.
pub fn parse_options(raw: &str) -> Option<Map<String, Value>> {
    let mut options: Map<String, Value> = serde_json::from_str(raw).ok()?;
    for value in options.values_mut() {
        if let Some(integer) = whole_number(value) {
            *value = Value::Number(integer);
        }
    }
    Some(options)
}

fn whole_number(value: &Value) -> Option<Number> {
    let Value::Number(number) = value else {
        return None;
    };
    if number.is_i64() || number.is_u64() {
        return None;
    }
    let float = number.as_f64()?;
    if float.fract() != 0.0 || float < i64::MIN as f64 || float > i64::MAX as f64 {
        return None;
    }
    Some(Number::from(float as i64))
}
