use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use server_launcher::LaunchRequest;
use tokio::{io::AsyncReadExt, sync::oneshot, time::timeout};

use crate::common::{capture_sink, http_get, marker_readiness, stub_launcher};

#[tokio::test]
async fn listen_returns_before_ready_and_fires_callback_once() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_secs(10)));
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = oneshot::channel();
    let request = LaunchRequest::new().with_option("ready_delay_ms", 300);

    let counter = Arc::clone(&calls);
    let mut handle = launcher.listen(request, move |port| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(port);
    })?;
    assert!(
        rx.try_recv().is_err(),
        "callback must not fire before the server is ready"
    );

    let port = timeout(Duration::from_secs(10), rx).await??;
    assert_eq!(port, handle.port());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let response = http_get(port).await?;
    assert!(response.contains("501"), "response: {response}");

    handle.kill().await?;
    Ok(())
}

#[tokio::test]
async fn listen_callback_never_fires_without_marker() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_millis(300)));
    let (sink, _captured) = capture_sink();
    let (tx, rx) = oneshot::channel::<u16>();
    let request = LaunchRequest::new().with_option("announce", false);

    let mut handle = launcher.listen_forwarding(request, sink, move |port| {
        let _ = tx.send(port);
    })?;

    // Sender is dropped once readiness gives up.
    let outcome = timeout(Duration::from_secs(5), rx).await?;
    assert!(outcome.is_err(), "callback fired with {outcome:?}");

    handle.kill().await?;
    Ok(())
}

#[tokio::test]
async fn profile_and_options_reach_the_server() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_secs(10)));
    let (tx, rx) = oneshot::channel();
    let request = LaunchRequest::for_profile("should arrive from server to client")
        .with_option("pingInterval", 50)
        .with_option("host", "127.0.0.1");

    let mut handle = launcher.listen(request, move |port| {
        let _ = tx.send(port);
    })?;
    assert_eq!(handle.profile(), "should arrive from server to client");

    let port = timeout(Duration::from_secs(10), rx).await??;
    assert!(http_get(port).await?.contains("Not Implemented."));

    handle.kill().await?;
    Ok(())
}

#[tokio::test]
async fn wait_on_listen_handle_drains_forwarded_output() -> Result<()> {
    let launcher = stub_launcher(marker_readiness(Duration::from_secs(10)));
    let (sink, mut captured) = capture_sink();
    let (tx, rx) = oneshot::channel();
    let request = LaunchRequest::new()
        .with_option("preamble", "starting...\n")
        .with_option("exit_after_ms", 300);

    let mut handle = launcher.listen_forwarding(request, sink, move |port| {
        let _ = tx.send(port);
    })?;
    timeout(Duration::from_secs(10), rx).await??;

    let status = handle.wait().await?;
    assert!(status.success(), "status: {status:?}");

    // Forwarding has finished, so the sink is already closed.
    let mut forwarded = Vec::new();
    timeout(Duration::from_millis(100), captured.read_to_end(&mut forwarded))
        .await
        .context("forwarded output still open after wait")??;
    assert_eq!(String::from_utf8(forwarded)?, "starting...\n\n");
    Ok(())
}
