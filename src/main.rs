//! Entry point for server-launcher.
use std::process::ExitCode;

use clap::Parser;
use server_launcher::{
    cli::{LaunchProfileArgs, ParsedCommand},
    lib::telemetry,
    runtime::{self, RuntimeExit},
};

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    telemetry::init_tracing().map_err(RuntimeExit::from_error)?;
    let args = LaunchProfileArgs::parse();
    let command = args.into_command().map_err(RuntimeExit::from_error)?;

    match command {
        ParsedCommand::Launch(profile) => runtime::run_launch(profile).await,
        ParsedCommand::StubServer(server_args) => runtime::run_stub(server_args).await,
    }
}
