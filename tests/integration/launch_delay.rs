use std::time::{Duration, Instant};

use anyhow::Result;
use server_launcher::LaunchRequest;
use tokio::time::timeout;

use crate::common::{delay_readiness, http_get, stub_launcher};

#[tokio::test]
async fn fixed_delay_resolves_no_earlier_than_delay() -> Result<()> {
    let launcher = stub_launcher(delay_readiness(Duration::from_millis(400)));

    let started = Instant::now();
    let ready = launcher.launch(LaunchRequest::new()).await?;
    assert!(
        started.elapsed() >= Duration::from_millis(400),
        "ready after {:?}",
        started.elapsed()
    );
    assert!(ready.handle.id().is_some(), "server should still be running");

    let response = http_get(ready.port).await?;
    assert!(response.contains("501 Not Implemented"), "response: {response}");

    let mut handle = ready.into_handle();
    handle.kill().await?;
    Ok(())
}

#[tokio::test]
async fn handle_wait_reports_server_exit() -> Result<()> {
    let launcher = stub_launcher(delay_readiness(Duration::from_millis(50)));
    let request = LaunchRequest::for_profile("short-lived").with_option("exit_after_ms", 300);

    let ready = launcher.launch(request).await?;
    let mut handle = ready.into_handle();
    assert_eq!(handle.profile(), "short-lived");

    let status = timeout(Duration::from_secs(10), handle.wait()).await??;
    assert!(status.success(), "stub should exit cleanly: {status:?}");
    assert!(handle.try_wait()?.is_some());
    Ok(())
}
