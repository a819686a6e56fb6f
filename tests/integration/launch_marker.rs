use std::time::Duration;

use anyhow::Result;
use server_launcher::{lib::errors::ErrorKind, LaunchRequest};

use crate::common::{capture_sink, http_get, marker_readiness, read_captured, stub_launcher};

#[tokio::test]
async fn marker_launch_reports_port_and_strips_marker() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_secs(10)));
    let (sink, captured) = capture_sink();
    let request = LaunchRequest::new()
        .with_option("preamble", "starting...\n")
        .with_option("ready_delay_ms", 50);

    let ready = launcher.launch_forwarding(request, sink).await?;
    assert!((20000..60000).contains(&ready.port), "port {}", ready.port);
    assert_eq!(ready.handle.port(), ready.port);
    assert_eq!(ready.handle.profile(), "default");

    let response = http_get(ready.port).await?;
    assert!(
        response.starts_with("HTTP/1.1 501 Not Implemented"),
        "response: {response}"
    );
    assert!(response.ends_with("Not Implemented."), "response: {response}");

    let mut handle = ready.into_handle();
    handle.kill().await?;
    assert_eq!(read_captured(captured).await?, "starting...\n\n");
    Ok(())
}

#[tokio::test]
async fn missing_marker_times_out() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_millis(500)));
    let (sink, _captured) = capture_sink();
    let request = LaunchRequest::new().with_option("announce", false);

    let err = launcher
        .launch_forwarding(request, sink)
        .await
        .expect_err("silent server must not become ready");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    Ok(())
}

#[tokio::test]
async fn server_exiting_before_marker_reports_closed_stream() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_secs(10)));
    let (sink, captured) = capture_sink();
    let request = LaunchRequest::new().with_option("host", "192.0.2.1");

    let err = launcher
        .launch_forwarding(request, sink)
        .await
        .expect_err("bind failure must not become ready");
    assert_eq!(err.kind(), ErrorKind::Closed);

    let forwarded = read_captured(captured).await?;
    assert!(
        forwarded.contains("failed to bind stub server"),
        "forwarded: {forwarded}"
    );
    Ok(())
}

#[tokio::test]
async fn launching_missing_program_fails_with_spawn_error() {
    let launcher = server_launcher::Launcher::new("/nonexistent/server-launcher-stub");
    let err = launcher
        .launch(LaunchRequest::new())
        .await
        .expect_err("spawn must fail");
    assert_eq!(err.kind(), ErrorKind::Spawn);
}
