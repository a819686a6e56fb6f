//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::{build_launch_args, resolve_config_path, LaunchProfile, ReadinessMode, ReadinessOverrides};
use crate::{
    launcher::{LaunchRequest, DEFAULT_PROFILE},
    stub::ServerArgs,
};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    Launch(LaunchProfile),
    StubServer(ServerArgs),
}

/// Top-level optional CLI commands.
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run the bundled stub server (the launched side of the contract).
    #[command(about = "Run a stub server that prints the readiness marker and answers 501")]
    StubServer(StubServerArgs),
}

/// Arguments for `stub-server`, in launch-contract order.
#[derive(Debug, Clone, Args)]
pub struct StubServerArgs {
    /// Port to bind.
    pub port: String,
    /// Profile name.
    pub profile: String,
    /// Options as a JSON object.
    pub options: Option<String>,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Launch a server on an ephemeral port and wait for it to become ready",
    long_about = None,
    args_conflicts_with_subcommands = true,
    after_help = "Example: server-launcher --profile default --options '{\"pingTimeout\":500}' -- go run tester.go"
)]
pub struct LaunchProfileArgs {
    /// Path to launcher.toml (overrides LAUNCHER_CONFIG_PATH).
    #[arg(long = "config")]
    pub config_override: Option<PathBuf>,
    /// Profile name passed to the server.
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: String,
    /// Options passed to the server, as a JSON object.
    #[arg(long)]
    pub options: Option<String>,
    /// Readiness strategy (overrides [readiness].strategy).
    #[arg(long, value_enum)]
    pub readiness: Option<ReadinessMode>,
    /// Delay for the `delay` strategy, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Marker for the `marker` strategy.
    #[arg(long)]
    pub marker: Option<String>,
    /// Give up waiting for the marker after this many seconds (0 waits forever).
    #[arg(long)]
    pub ready_timeout_secs: Option<u64>,
    /// Optional CLI command mode.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
    /// Server program and its leading arguments.
    #[arg(last = true)]
    pub program: Vec<String>,
}

impl LaunchProfileArgs {
    /// Build a `LaunchProfile` from CLI args and environment variables.
    pub fn build(self) -> Result<LaunchProfile> {
        let config_path = resolve_config_path(self.config_override)?;

        let mut request = LaunchRequest::for_profile(self.profile);
        if let Some(raw) = self.options.as_deref() {
            request = request.with_options_json(raw)?;
        }

        let readiness = ReadinessOverrides {
            mode: self.readiness,
            delay_ms: self.delay_ms,
            marker: self.marker,
            timeout_secs: self.ready_timeout_secs,
        };
        let launch_args = build_launch_args(config_path.as_ref(), &request, &readiness);

        Ok(LaunchProfile {
            config_path,
            request,
            readiness,
            program: self.program,
            launch_args,
        })
    }

    /// Parse CLI args into either launch mode or stub server mode.
    pub fn into_command(self) -> Result<ParsedCommand> {
        match self.command {
            Some(CliCommand::StubServer(args)) => {
                let mut positional = vec![args.port, args.profile];
                positional.extend(args.options);
                let server_args = ServerArgs::parse(positional)?;
                Ok(ParsedCommand::StubServer(server_args))
            }
            None => Ok(ParsedCommand::Launch(self.build()?)),
        }
    }
}
