use std::process::{Command, Stdio};

use anyhow::Result;
use serde_json::Value;
use tempfile::tempdir;

use crate::common::{write_config, BINARY_PATH};

#[test]
fn cli_prints_ready_payload_and_propagates_exit() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(
        dir.path(),
        &format!(
            r#"
[process]
program = "{BINARY_PATH}"
args = ["stub-server"]
port_range = [20000, 60000]

[readiness]
strategy = "marker"
timeout_secs = 10
"#
        ),
    );

    let output = Command::new(BINARY_PATH)
        .arg("--config")
        .arg(&config)
        .args(["--profile", "cli-profile", "--options", r#"{"exit_after_ms":300}"#])
        .env("RUST_LOG", "off")
        .stdin(Stdio::null())
        .output()?;

    assert!(
        output.status.success(),
        "launcher failed: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    let line = stdout.lines().next().expect("ready payload line");
    let payload: Value = serde_json::from_str(line)?;
    assert_eq!(payload["status"], "ready");
    assert_eq!(payload["profile"], "cli-profile");
    let port = payload["port"].as_u64().expect("numeric port");
    assert!((20000..60000).contains(&port), "port {port}");
    Ok(())
}

#[test]
fn cli_program_after_separator_overrides_config() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(
        dir.path(),
        "[process]\nprogram = \"/nonexistent/server\"\nport_range = [20000, 60000]\n",
    );

    let output = Command::new(BINARY_PATH)
        .arg("--config")
        .arg(&config)
        .args(["--readiness", "delay", "--delay-ms", "100"])
        .args(["--options", r#"{"exit_after_ms":400}"#])
        .arg("--")
        .arg(BINARY_PATH)
        .arg("stub-server")
        .env("RUST_LOG", "off")
        .stdin(Stdio::null())
        .output()?;

    assert!(
        output.status.success(),
        "launcher failed: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("\"status\":\"ready\""), "stdout: {stdout}");
    Ok(())
}

#[test]
fn cli_reports_spawn_failure_with_structured_error() -> Result<()> {
    let output = Command::new(BINARY_PATH)
        .args(["--", "/nonexistent/server-binary"])
        .env("RUST_LOG", "off")
        .env_remove("LAUNCHER_CONFIG_PATH")
        .stdin(Stdio::null())
        .output()?;

    assert_eq!(output.status.code(), Some(42), "status: {:?}", output.status);
    let stderr = String::from_utf8(output.stderr)?;
    let payload: Value = serde_json::from_str(stderr.trim())?;
    assert_eq!(payload["code"], "spawn_failed");
    Ok(())
}

#[test]
fn cli_without_program_fails() {
    let dir = tempdir().expect("can create temporary directory");
    let status = Command::new(BINARY_PATH)
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .env_remove("LAUNCHER_CONFIG_PATH")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("process should start");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn cli_rejects_non_object_options_with_structured_error() -> Result<()> {
    let output = Command::new(BINARY_PATH)
        .args(["--options", "[1]", "--", "/nonexistent/server-binary"])
        .env("RUST_LOG", "off")
        .env_remove("LAUNCHER_CONFIG_PATH")
        .stdin(Stdio::null())
        .output()?;

    assert_eq!(output.status.code(), Some(2), "status: {:?}", output.status);
    let stderr = String::from_utf8(output.stderr)?;
    let payload: Value = serde_json::from_str(stderr.trim())?;
    assert_eq!(payload["code"], "invalid_options");
    Ok(())
}
