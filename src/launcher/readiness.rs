//! Readiness detection strategies.
//!
//! A launched server is "ready" either after a fixed delay or once it prints a
//! marker on its error stream. Both strategies implement [`AwaitReady`] and the
//! configured one is carried around as [`Readiness`].

use std::{borrow::Cow, future::Future, io, pin::Pin, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::oneshot,
    task::JoinHandle,
    time,
};
use tracing::debug;

use crate::lib::errors::LaunchError;

pub const DEFAULT_MARKER: &str = "server ready";
pub const DEFAULT_READY_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

const CHUNK_SIZE: usize = 8 * 1024;

/// Error output of the launched server.
pub type DiagnosticStream = Pin<Box<dyn AsyncRead + Send>>;
/// Where the server's error output is forwarded.
pub type DiagnosticSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Inputs for a single readiness wait.
pub struct ReadinessProbe {
    pub port: u16,
    /// Present only when the server was spawned with a piped stderr.
    pub diagnostics: Option<DiagnosticStream>,
    pub forward_to: DiagnosticSink,
}

impl ReadinessProbe {
    pub fn new(port: u16, diagnostics: Option<DiagnosticStream>, forward_to: DiagnosticSink) -> Self {
        Self {
            port,
            diagnostics,
            forward_to,
        }
    }
}

/// Result of a successful readiness wait.
#[derive(Debug)]
pub struct ReadyOutcome {
    pub port: u16,
    /// Task still forwarding the server's error output, if any.
    pub forwarder: Option<JoinHandle<io::Result<()>>>,
}

/// Capability shared by every readiness strategy.
pub trait AwaitReady {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the server must be spawned with a piped stderr.
    fn pipes_diagnostics(&self) -> bool;

    /// Resolve with the probe's port once the server counts as ready.
    fn await_ready(
        &self,
        probe: ReadinessProbe,
    ) -> impl Future<Output = Result<ReadyOutcome, LaunchError>> + Send;
}

/// Ready after a fixed delay, regardless of server state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            delay: DEFAULT_READY_DELAY,
        }
    }
}

impl AwaitReady for FixedDelay {
    fn name(&self) -> &'static str {
        "delay"
    }

    fn pipes_diagnostics(&self) -> bool {
        false
    }

    fn await_ready(
        &self,
        probe: ReadinessProbe,
    ) -> impl Future<Output = Result<ReadyOutcome, LaunchError>> + Send {
        let delay = self.delay;
        async move {
            // Nothing to scan; a piped stream is still drained so the server never blocks on it.
            let forwarder = probe
                .diagnostics
                .map(|stream| tokio::spawn(forward_verbatim(stream, probe.forward_to)));
            time::sleep(delay).await;
            Ok(ReadyOutcome {
                port: probe.port,
                forwarder,
            })
        }
    }
}

/// Ready once the marker shows up on the server's error stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerScan {
    pub marker: String,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for MarkerScan {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            timeout: Some(DEFAULT_READY_TIMEOUT),
        }
    }
}

impl AwaitReady for MarkerScan {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn pipes_diagnostics(&self) -> bool {
        true
    }

    fn await_ready(
        &self,
        probe: ReadinessProbe,
    ) -> impl Future<Output = Result<ReadyOutcome, LaunchError>> + Send {
        let marker = self.marker.clone();
        let timeout = self.timeout;
        async move {
            let stream = probe
                .diagnostics
                .ok_or(LaunchError::DiagnosticsUnavailable)?;
            let (ready_tx, ready_rx) = oneshot::channel();
            let forwarder = tokio::spawn(pump_diagnostics(
                stream,
                probe.forward_to,
                MarkerScanner::new(marker.clone()),
                ready_tx,
            ));

            let signalled = match timeout {
                Some(limit) => time::timeout(limit, ready_rx).await.map_err(|_| {
                    LaunchError::ReadyTimeout {
                        marker: marker.clone(),
                        waited_ms: limit.as_millis() as u64,
                    }
                })?,
                None => ready_rx.await,
            };

            match signalled {
                Ok(()) => Ok(ReadyOutcome {
                    port: probe.port,
                    forwarder: Some(forwarder),
                }),
                Err(_) => Err(LaunchError::DiagnosticsClosed { marker }),
            }
        }
    }
}

/// The configured strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    FixedDelay(FixedDelay),
    Marker(MarkerScan),
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::Marker(MarkerScan::default())
    }
}

impl AwaitReady for Readiness {
    fn name(&self) -> &'static str {
        match self {
            Readiness::FixedDelay(strategy) => strategy.name(),
            Readiness::Marker(strategy) => strategy.name(),
        }
    }

    fn pipes_diagnostics(&self) -> bool {
        match self {
            Readiness::FixedDelay(strategy) => strategy.pipes_diagnostics(),
            Readiness::Marker(strategy) => strategy.pipes_diagnostics(),
        }
    }

    fn await_ready(
        &self,
        probe: ReadinessProbe,
    ) -> impl Future<Output = Result<ReadyOutcome, LaunchError>> + Send {
        let strategy = self.clone();
        async move {
            match strategy {
                Readiness::FixedDelay(inner) => inner.await_ready(probe).await,
                Readiness::Marker(inner) => inner.await_ready(probe).await,
            }
        }
    }
}

/// What to forward for one chunk, and whether it carried the marker.
#[derive(Debug, PartialEq, Eq)]
pub struct ScanOutcome<'a> {
    pub forward: Cow<'a, [u8]>,
    pub ready: bool,
}

/// Chunk-by-chunk marker detection. Fires once; later chunks pass through untouched.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    marker: Vec<u8>,
    fired: bool,
}

impl MarkerScanner {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().into_bytes(),
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn scan<'a>(&mut self, chunk: &'a [u8]) -> ScanOutcome<'a> {
        if self.fired {
            return ScanOutcome {
                forward: Cow::Borrowed(chunk),
                ready: false,
            };
        }

        match find_subslice(chunk, &self.marker) {
            Some(at) => {
                self.fired = true;
                let mut stripped = Vec::with_capacity(chunk.len() - self.marker.len());
                stripped.extend_from_slice(&chunk[..at]);
                stripped.extend_from_slice(&chunk[at + self.marker.len()..]);
                ScanOutcome {
                    forward: Cow::Owned(stripped),
                    ready: true,
                }
            }
            None => ScanOutcome {
                forward: Cow::Borrowed(chunk),
                ready: false,
            },
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

async fn pump_diagnostics(
    mut stream: DiagnosticStream,
    mut sink: DiagnosticSink,
    mut scanner: MarkerScanner,
    ready_tx: oneshot::Sender<()>,
) -> io::Result<()> {
    let mut ready_tx = Some(ready_tx);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        let outcome = scanner.scan(&buf[..read]);
        if outcome.ready {
            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(());
            }
        }
        sink.write_all(&outcome.forward).await?;
        sink.flush().await?;
    }
    debug!(
        target: "server_launcher::launch",
        fired = scanner.has_fired(),
        "Server error stream closed"
    );
    Ok(())
}

async fn forward_verbatim(mut stream: DiagnosticStream, mut sink: DiagnosticSink) -> io::Result<()> {
    tokio::io::copy(&mut stream, &mut sink).await?;
    sink.flush().await
}
