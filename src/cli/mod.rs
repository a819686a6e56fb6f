//! CLI entrypoint module structure.
use anyhow::Result;
use serde_json::json;

use crate::launcher::ReadyServer;

pub mod args;
pub mod profile;

pub use args::{CliCommand, LaunchProfileArgs, ParsedCommand, StubServerArgs};
pub use profile::{
    build_launch_args, resolve_config_path, LaunchProfile, ReadinessMode, ReadinessOverrides,
};

/// Format the line printed on stdout once the launched server is ready.
pub fn ready_payload(ready: &ReadyServer) -> Result<String> {
    let payload = json!({
        "status": "ready",
        "port": ready.port,
        "pid": ready.handle.id(),
        "profile": ready.handle.profile(),
        "launch_id": ready.handle.launch_id().to_string(),
    });

    Ok(serde_json::to_string(&payload)?)
}
