//! Minimal server that follows the launch contract.
//!
//! Binds the given port, prints the readiness marker to stderr and answers
//! every HTTP request with `501 Not Implemented.`. Behavior is tuned through
//! the options JSON:
//!
//! - `host`: bind address, default `0.0.0.0`
//! - `preamble`: text written to stderr before the marker
//! - `ready_delay_ms`: pause before printing the marker
//! - `announce`: set to `false` to never print the marker
//! - `exit_after_ms`: stop serving and exit after this long
use std::{convert::Infallible, time::Duration};

use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::{
    body::{Bytes, Incoming},
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use serde_json::{Map, Value};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    time,
};
use tracing::{debug, info};

use crate::launcher::readiness::DEFAULT_MARKER;

pub mod args;

pub use args::{parse_options, ServerArgs};

const DEFAULT_HOST: &str = "0.0.0.0";
const NOT_IMPLEMENTED_BODY: &str = "Not Implemented.";

/// Stub behavior derived from the launch options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSettings {
    pub host: String,
    pub preamble: Option<String>,
    pub ready_delay: Duration,
    pub announce: bool,
    pub exit_after: Option<Duration>,
}

impl Default for StubSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            preamble: None,
            ready_delay: Duration::ZERO,
            announce: true,
            exit_after: None,
        }
    }
}

impl StubSettings {
    pub fn from_options(options: Option<&Map<String, Value>>) -> Self {
        let mut settings = Self::default();
        let Some(options) = options else {
            return settings;
        };
        if let Some(host) = options.get("host").and_then(Value::as_str) {
            settings.host = host.to_string();
        }
        settings.preamble = options
            .get("preamble")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(ms) = options.get("ready_delay_ms").and_then(Value::as_u64) {
            settings.ready_delay = Duration::from_millis(ms);
        }
        if let Some(announce) = options.get("announce").and_then(Value::as_bool) {
            settings.announce = announce;
        }
        settings.exit_after = options
            .get("exit_after_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis);
        settings
    }
}

/// Write the readiness marker followed by a newline.
pub async fn announce_ready<W>(writer: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(DEFAULT_MARKER.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Run the stub server until `exit_after_ms` elapses or forever.
pub async fn run(args: ServerArgs) -> Result<()> {
    let settings = StubSettings::from_options(args.options.as_ref());
    let addr = format!("{}:{}", settings.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind stub server to {addr}"))?;

    let mut stderr = tokio::io::stderr();
    if let Some(preamble) = &settings.preamble {
        stderr.write_all(preamble.as_bytes()).await?;
        stderr.flush().await?;
    }
    if !settings.ready_delay.is_zero() {
        time::sleep(settings.ready_delay).await;
    }
    if settings.announce {
        announce_ready(&mut stderr).await?;
    }
    info!(
        target: "server_launcher::stub",
        bind_addr = %addr,
        profile = %args.profile,
        announced = settings.announce,
        "Stub server accepting connections"
    );

    match settings.exit_after {
        Some(limit) => match time::timeout(limit, serve(listener)).await {
            Ok(result) => result,
            Err(_) => {
                info!(
                    target: "server_launcher::stub",
                    after_ms = limit.as_millis() as u64,
                    "Stub server exiting"
                );
                Ok(())
            }
        },
        None => serve(listener).await,
    }
}

async fn serve(listener: TcpListener) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("failed to accept connection")?;
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(err) = http1::Builder::new()
                .keep_alive(false)
                .serve_connection(io, service_fn(not_implemented))
                .await
            {
                debug!(
                    target: "server_launcher::stub",
                    peer = %peer,
                    reason = %err,
                    "Dropped connection"
                );
            }
        });
    }
}

/// Every route answers `501`.
async fn not_implemented(_request: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(not_implemented_response())
}

fn not_implemented_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(NOT_IMPLEMENTED_BODY.as_bytes())));
    *response.status_mut() = StatusCode::NOT_IMPLEMENTED;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
