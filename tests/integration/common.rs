use std::{ops::Range, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use server_launcher::{
    launcher::{DiagnosticSink, FixedDelay, MarkerScan, Readiness},
    Launcher,
};
use tokio::{
    io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream},
    net::TcpStream,
    time::timeout,
};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_server-launcher");
/// Unprivileged ports only, so tests pass without root.
pub const TEST_PORT_RANGE: Range<u16> = 20000..60000;

pub fn marker_readiness(limit: Duration) -> Readiness {
    Readiness::Marker(MarkerScan {
        timeout: Some(limit),
        ..MarkerScan::default()
    })
}

pub fn delay_readiness(delay: Duration) -> Readiness {
    Readiness::FixedDelay(FixedDelay { delay })
}

/// Launcher that starts this crate's stub server.
pub fn stub_launcher(readiness: Readiness) -> Launcher {
    Launcher::new(BINARY_PATH)
        .with_args(["stub-server"])
        .with_port_range(TEST_PORT_RANGE)
        .with_env("RUST_LOG", "off")
        .with_readiness(readiness)
}

/// Sink capturing forwarded server error output.
pub fn capture_sink() -> (DiagnosticSink, DuplexStream) {
    let (sink, captured) = duplex(64 * 1024);
    (Box::pin(sink), captured)
}

pub async fn read_captured(mut captured: DuplexStream) -> Result<String> {
    let mut out = Vec::new();
    timeout(Duration::from_secs(5), captured.read_to_end(&mut out))
        .await
        .context("forwarded output did not close")??;
    Ok(String::from_utf8(out)?)
}

/// Send a bare HTTP request and return the full response.
pub async fn http_get(port: u16) -> Result<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to connect to stub server on {port}"))?;
    stream
        .write_all(b"GET /engine.io/?EIO=4&transport=polling HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await?;
    let mut response = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .context("stub server did not close the connection")??;
    Ok(String::from_utf8(response)?)
}

pub fn write_config(dir: &std::path::Path, contents: &str) -> PathBuf {
    let path = dir.join("launcher.toml");
    std::fs::write(&path, contents).expect("can write config");
    path
}
