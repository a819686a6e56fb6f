//! Launch a server on an ephemeral port and report when it is ready.

use std::{
    collections::BTreeMap,
    io,
    ops::Range,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use tokio::{process::Child, sync::oneshot, task::JoinHandle};
use tracing::warn;
use uuid::Uuid;

use crate::lib::{
    command::{build_server_command, command_args, ServerCommandConfig, ServerLaunchArgs},
    errors::{ConfigError, LaunchError},
    port::random_port,
    telemetry::{self, LaunchSpan, LaunchTelemetry},
};

pub mod config;
pub mod readiness;
pub mod request;

pub use self::config::{LauncherConfig, ProcessSection};
pub use readiness::{
    AwaitReady, DiagnosticSink, FixedDelay, MarkerScan, MarkerScanner, Readiness, ReadinessProbe,
    ReadyOutcome,
};
pub use request::{LaunchOptions, LaunchRequest, DEFAULT_PROFILE};

/// Spawns servers for launch requests.
#[derive(Debug, Clone)]
pub struct Launcher {
    program: PathBuf,
    /// Placed before the positional launch arguments.
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    port_range: Range<u16>,
    kill_on_drop: bool,
    env: BTreeMap<String, String>,
    readiness: Readiness,
}

impl Launcher {
    /// Launcher for `program` with default settings.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let defaults = ProcessSection::default();
        Self {
            program: program.into(),
            args: defaults.args,
            working_dir: defaults.working_dir,
            port_range: defaults.port_range,
            kill_on_drop: defaults.kill_on_drop,
            env: BTreeMap::new(),
            readiness: Readiness::default(),
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Result<Self, ConfigError> {
        let program = config.require_program()?;
        let process = &config.process;
        Ok(Self {
            program,
            args: process.args.clone(),
            working_dir: process.working_dir.clone(),
            port_range: process.port_range.clone(),
            kill_on_drop: process.kill_on_drop,
            env: BTreeMap::new(),
            readiness: config.readiness.clone(),
        })
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Draw ports from `range` (end exclusive). Empty ranges are ignored.
    pub fn with_port_range(mut self, range: Range<u16>) -> Self {
        if !range.is_empty() {
            self.port_range = range;
        }
        self
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn kill_on_drop(mut self, enabled: bool) -> Self {
        self.kill_on_drop = enabled;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Spawn a server and call `on_ready` with its port once it is ready.
    ///
    /// Returns as soon as the process is spawned. The callback runs at most
    /// once, on a runtime task; if readiness fails it never runs and the
    /// failure is logged. Once ready, the forwarding task is handed back to
    /// the returned handle so `wait` and `kill` drain it.
    pub fn listen<F>(&self, request: LaunchRequest, on_ready: F) -> Result<ServerHandle, LaunchError>
    where
        F: FnOnce(u16) + Send + 'static,
    {
        self.listen_forwarding(request, Box::pin(tokio::io::stderr()), on_ready)
    }

    /// [`Launcher::listen`] with the server's error output forwarded to `sink`.
    pub fn listen_forwarding<F>(
        &self,
        request: LaunchRequest,
        sink: DiagnosticSink,
        on_ready: F,
    ) -> Result<ServerHandle, LaunchError>
    where
        F: FnOnce(u16) + Send + 'static,
    {
        let (mut handle, probe, span) = self.spawn(&request, sink)?;
        let (forwarder_tx, forwarder_rx) = oneshot::channel();
        handle.forwarding = Forwarding::Pending(forwarder_rx);
        let readiness = self.readiness.clone();
        tokio::spawn(async move {
            match readiness.await_ready(probe).await {
                Ok(outcome) => {
                    span.finish("ready");
                    // Handle may already be gone; the forwarder then runs detached.
                    let _ = forwarder_tx.send(outcome.forwarder);
                    on_ready(outcome.port);
                }
                Err(err) => {
                    warn!(
                        target: "server_launcher::launch",
                        launch_id = %span.launch_id(),
                        reason = %err,
                        "Readiness callback will not fire"
                    );
                    span.finish(status_for(&err));
                }
            }
        });
        Ok(handle)
    }

    /// Spawn a server and wait until it is ready.
    pub async fn launch(&self, request: LaunchRequest) -> Result<ReadyServer, LaunchError> {
        self.launch_forwarding(request, Box::pin(tokio::io::stderr()))
            .await
    }

    /// [`Launcher::launch`] with the server's error output forwarded to `sink`.
    pub async fn launch_forwarding(
        &self,
        request: LaunchRequest,
        sink: DiagnosticSink,
    ) -> Result<ReadyServer, LaunchError> {
        let (mut handle, probe, span) = self.spawn(&request, sink)?;
        match self.readiness.await_ready(probe).await {
            Ok(outcome) => {
                span.finish("ready");
                handle.forwarding = Forwarding::from(outcome.forwarder);
                Ok(ReadyServer {
                    port: outcome.port,
                    handle,
                })
            }
            Err(err) => {
                span.finish(status_for(&err));
                Err(err)
            }
        }
    }

    fn spawn(
        &self,
        request: &LaunchRequest,
        sink: DiagnosticSink,
    ) -> Result<(ServerHandle, ReadinessProbe, LaunchSpan), LaunchError> {
        let options_json = request.options_json()?;
        let port = random_port(self.port_range.clone());
        let mut command = build_server_command(
            ServerCommandConfig {
                program: &self.program,
                prefix_args: &self.args,
                working_dir: self.working_dir.as_deref(),
                env: &self.env,
                kill_on_drop: self.kill_on_drop,
                pipe_stderr: self.readiness.pipes_diagnostics(),
            },
            ServerLaunchArgs {
                port,
                profile: &request.profile,
                options_json: &options_json,
            },
        );
        let args = command_args(&command);

        let launch_id = Uuid::new_v4();
        let span = LaunchSpan::start(launch_id, self.readiness.name(), port);
        let mut child = command.spawn().map_err(|source| {
            log_spawn_failure(launch_id, &self.program, &source);
            LaunchError::Spawn {
                program: self.program.clone(),
                source,
            }
        })?;

        telemetry::emit_spawned(&LaunchTelemetry {
            launch_id,
            program: &self.program.to_string_lossy(),
            pid: child.id(),
            port,
            profile: &request.profile,
            strategy: self.readiness.name(),
            args: &args,
        });

        let diagnostics = child
            .stderr
            .take()
            .map(|stderr| Box::pin(stderr) as readiness::DiagnosticStream);
        let probe = ReadinessProbe::new(port, diagnostics, sink);
        let handle = ServerHandle {
            launch_id,
            port,
            profile: request.profile.clone(),
            child,
            forwarding: Forwarding::Idle,
        };
        Ok((handle, probe, span))
    }
}

fn status_for(err: &LaunchError) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else {
        "failed"
    }
}

fn log_spawn_failure(launch_id: Uuid, program: &Path, source: &io::Error) {
    warn!(
        target: "server_launcher::launch",
        %launch_id,
        program = %program.display(),
        reason = %source,
        "Failed to spawn server process"
    );
}

/// A spawned server owned by the caller.
#[derive(Debug)]
pub struct ServerHandle {
    launch_id: Uuid,
    port: u16,
    profile: String,
    child: Child,
    forwarding: Forwarding,
}

type Forwarder = JoinHandle<io::Result<()>>;

/// Where the task forwarding the server's error output can be found.
#[derive(Debug)]
enum Forwarding {
    Idle,
    Running(Forwarder),
    /// Sent over once a `listen` readiness wait succeeds.
    Pending(oneshot::Receiver<Option<Forwarder>>),
}

impl From<Option<Forwarder>> for Forwarding {
    fn from(forwarder: Option<Forwarder>) -> Self {
        forwarder.map_or(Forwarding::Idle, Forwarding::Running)
    }
}

impl ServerHandle {
    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// OS process id, `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the server to exit and for its forwarded output to drain.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.drain_forwarder().await;
        Ok(status)
    }

    /// Kill the server and reap it.
    pub async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await?;
        self.drain_forwarder().await;
        Ok(())
    }

    async fn drain_forwarder(&mut self) {
        let forwarder = match std::mem::replace(&mut self.forwarding, Forwarding::Idle) {
            Forwarding::Idle => None,
            Forwarding::Running(forwarder) => Some(forwarder),
            // A failed readiness wait drops the sender.
            Forwarding::Pending(receiver) => receiver.await.ok().flatten(),
        };
        if let Some(forwarder) = forwarder {
            match forwarder.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    target: "server_launcher::launch",
                    launch_id = %self.launch_id,
                    reason = %err,
                    "Forwarding server error output failed"
                ),
                Err(err) => warn!(
                    target: "server_launcher::launch",
                    launch_id = %self.launch_id,
                    reason = %err,
                    "Forwarding task ended abnormally"
                ),
            }
        }
    }
}

/// A server that has signalled readiness.
#[derive(Debug)]
pub struct ReadyServer {
    pub port: u16,
    pub handle: ServerHandle,
}

impl ReadyServer {
    pub fn into_handle(self) -> ServerHandle {
        self.handle
    }
}
