//! Shared helpers for building the server command line.

use std::{
    collections::BTreeMap,
    path::Path,
    process::Stdio,
};

use tokio::process::Command;

pub struct ServerCommandConfig<'a> {
    pub program: &'a Path,
    pub prefix_args: &'a [String],
    pub working_dir: Option<&'a Path>,
    pub env: &'a BTreeMap<String, String>,
    pub kill_on_drop: bool,
    /// Pipe stderr instead of inheriting it.
    pub pipe_stderr: bool,
}

pub struct ServerLaunchArgs<'a> {
    pub port: u16,
    pub profile: &'a str,
    pub options_json: &'a str,
}

/// Positional arguments handed to the server after the prefix args.
fn positional_args(launch: &ServerLaunchArgs<'_>) -> [String; 3] {
    [
        launch.port.to_string(),
        launch.profile.to_string(),
        launch.options_json.to_string(),
    ]
}

/// Build the command that starts a server for one launch.
pub fn build_server_command(
    config: ServerCommandConfig<'_>,
    launch: ServerLaunchArgs<'_>,
) -> Command {
    let mut command = Command::new(config.program);
    command.kill_on_drop(config.kill_on_drop);
    if let Some(dir) = config.working_dir {
        command.current_dir(dir);
    }
    for (key, value) in config.env {
        command.env(key, value);
    }

    command.args(config.prefix_args);
    command.args(positional_args(&launch));

    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    if config.pipe_stderr {
        command.stderr(Stdio::piped());
    } else {
        command.stderr(Stdio::inherit());
    }

    command
}

/// Arguments of a built command, as they will reach the server.
pub fn command_args(command: &Command) -> Vec<String> {
    command
        .as_std()
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn prefix_args_come_before_positional_args() {
        let prefix = vec!["run".to_string(), "tester.go".to_string()];
        let env = BTreeMap::new();
        let command = build_server_command(
            ServerCommandConfig {
                program: Path::new("go"),
                prefix_args: &prefix,
                working_dir: None,
                env: &env,
                kill_on_drop: true,
                pipe_stderr: false,
            },
            ServerLaunchArgs {
                port: 4321,
                profile: "default",
                options_json: "{}",
            },
        );

        assert_eq!(command.as_std().get_program(), OsStr::new("go"));
        assert_eq!(
            command_args(&command),
            ["run", "tester.go", "4321", "default", "{}"]
        );
    }

    #[test]
    fn working_dir_and_env_are_applied() {
        let mut env = BTreeMap::new();
        env.insert("EIO_DEBUG".to_string(), "1".to_string());
        let command = build_server_command(
            ServerCommandConfig {
                program: Path::new("/bin/server"),
                prefix_args: &[],
                working_dir: Some(Path::new("/tmp")),
                env: &env,
                kill_on_drop: false,
                pipe_stderr: true,
            },
            ServerLaunchArgs {
                port: 1000,
                profile: "should open with polling by default",
                options_json: "{\"pingTimeout\":500}",
            },
        );

        let std_command = command.as_std();
        assert_eq!(std_command.get_current_dir(), Some(Path::new("/tmp")));
        let envs: Vec<_> = std_command.get_envs().collect();
        assert_eq!(envs, [(OsStr::new("EIO_DEBUG"), Some(OsStr::new("1")))]);
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(
            args,
            [
                "1000",
                "should open with polling by default",
                "{\"pingTimeout\":500}"
            ]
        );
    }
}
