//! Telemetry initialization and launch span helpers.

use std::time::Instant;

use anyhow::Result;
use tracing::{info, info_span, warn, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Initialize `tracing` and format developer logs.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper to record start and finish of a single launch.
pub struct LaunchSpan {
    span: Span,
    started_at: Instant,
    launch_id: Uuid,
}

impl LaunchSpan {
    /// Start a launch span.
    pub fn start(launch_id: Uuid, strategy: &'static str, port: u16) -> Self {
        let span = info_span!(
            target: "server_launcher::launch",
            "launch",
            %launch_id,
            strategy,
            port
        );
        Self {
            span,
            started_at: Instant::now(),
            launch_id,
        }
    }

    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    /// Close the span while recording the readiness outcome.
    pub fn finish(self, status: &'static str) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        if status == "ready" {
            info!(
                target: "server_launcher::launch",
                launch_id = %self.launch_id,
                status = status,
                elapsed_ms = elapsed_ms,
                "Server signalled readiness"
            );
        } else {
            warn!(
                target: "server_launcher::launch",
                launch_id = %self.launch_id,
                status = status,
                elapsed_ms = elapsed_ms,
                "Server did not become ready"
            );
        }
    }
}

/// Payload for logging a spawned server as structured telemetry.
#[derive(Debug)]
pub struct LaunchTelemetry<'a> {
    pub launch_id: Uuid,
    pub program: &'a str,
    pub pid: Option<u32>,
    pub port: u16,
    pub profile: &'a str,
    pub strategy: &'static str,
    pub args: &'a [String],
}

/// Emit a spawned server to `tracing`.
pub fn emit_spawned(telemetry: &LaunchTelemetry<'_>) {
    info!(
        target: "server_launcher::launch",
        launch_id = %telemetry.launch_id,
        program = telemetry.program,
        pid = telemetry.pid.unwrap_or_default(),
        port = telemetry.port,
        profile = telemetry.profile,
        strategy = telemetry.strategy,
        args = ?telemetry.args,
        "Spawned server process"
    );
}
