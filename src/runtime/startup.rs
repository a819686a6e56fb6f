use std::process::{ExitCode, ExitStatus};

use anyhow::Error;
use serde_json::json;

use crate::{
    cli::{ready_payload, LaunchProfile},
    launcher::{Launcher, LauncherConfig},
    lib::errors::{ErrorDescriptor, ErrorKind, LaunchError},
    stub::{self, ServerArgs},
};

/// Bundles a runtime error message with an exit code and optional structured error data.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
    descriptor: Option<&'static ErrorDescriptor>,
}

impl RuntimeExit {
    /// Launch failures keep their structured exit; anything else exits with 1.
    pub fn from_error(err: impl Into<Error>) -> Self {
        match err.into().downcast::<LaunchError>() {
            Ok(launch) => Self::from_launch_error(launch),
            Err(err) => Self {
                message: format!("{err:?}"),
                exit_code: ExitCode::FAILURE,
                descriptor: None,
            },
        }
    }

    /// Structured exit for a failed launch.
    pub fn from_launch_error(err: LaunchError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidOptions => 2,
            ErrorKind::Spawn => 42,
            ErrorKind::Timeout => 43,
            ErrorKind::Closed => 44,
        };
        Self {
            message: err.to_string(),
            exit_code: ExitCode::from(code),
            descriptor: Some(err.descriptor()),
        }
    }

    /// Propagate an unsuccessful child exit status.
    pub fn from_child_status(status: ExitStatus) -> Self {
        let exit_code = match status.code() {
            Some(code) if (1..=255).contains(&code) => ExitCode::from(code as u8),
            _ => ExitCode::FAILURE,
        };
        Self {
            message: format!("server exited with {status}"),
            exit_code,
            descriptor: None,
        }
    }

    pub fn report(self) -> ExitCode {
        if let Some(desc) = self.descriptor {
            let payload = json!({
                "code": desc.code,
                "message": desc.message,
                "remediation": desc.remediation,
                "details": self.message,
            });
            match serde_json::to_string(&payload) {
                Ok(serialized) => eprintln!("{serialized}"),
                Err(_) => eprintln!("{}", self.message),
            }
        } else {
            eprintln!("{}", self.message);
        }
        self.exit_code
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn descriptor(&self) -> Option<&'static ErrorDescriptor> {
        self.descriptor
    }
}

/// Launch the configured server, print its readiness payload, then wait for it to exit.
pub async fn run_launch(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    let mut config =
        LauncherConfig::load_optional(profile.config_path.clone()).map_err(RuntimeExit::from_error)?;
    if let Some((program, args)) = profile.program.split_first() {
        config.process.program = Some(program.into());
        config.process.args = args.to_vec();
    }
    config.readiness = profile.readiness.apply(config.readiness);

    let launcher = Launcher::from_config(&config).map_err(RuntimeExit::from_error)?;
    tracing::info!(
        target: "server_launcher::runtime",
        program = %launcher.program().display(),
        launch_args = ?profile.launch_args,
        "Launching server"
    );

    let ready = launcher
        .launch(profile.request)
        .await
        .map_err(RuntimeExit::from_launch_error)?;
    println!("{}", ready_payload(&ready).map_err(RuntimeExit::from_error)?);

    let mut handle = ready.into_handle();
    let status = handle.wait().await.map_err(RuntimeExit::from_error)?;
    if status.success() {
        Ok(())
    } else {
        Err(RuntimeExit::from_child_status(status))
    }
}

/// Serve as the launched side of the contract.
pub async fn run_stub(args: ServerArgs) -> Result<(), RuntimeExit> {
    stub::run(args).await.map_err(RuntimeExit::from_error)
}
