use crate::config::TransportConfig;
use crate::events::EventSink;
use crate::message::{InboundEvent, ACK};
use crate::{PeerAddress, TransportError};

use ipchat_metrics::ServerStats;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Listener that accepts one message per connection and replies `ACK`.
///
/// Each accepted connection is handled on its own task, so a slow or hung
/// peer only holds its own connection until the read timeout expires.
pub struct DeliveryServer {
    listener: TcpListener,
    config: TransportConfig,
    stats: Arc<ServerStats>,
}

/// Handle to a spawned [`DeliveryServer`].
///
/// Dropping the handle stops the accept loop, same as [`shutdown`](Self::shutdown).
pub struct ServerHandle {
    local_addr: SocketAddr,
    stats: Arc<ServerStats>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// State shared by every connection task.
struct ConnContext {
    config: TransportConfig,
    stats: Arc<ServerStats>,
    sink: Arc<dyn EventSink>,
}

/// What a read produced before the message was considered complete.
enum ReadOutcome {
    /// The peer closed without sending anything (liveness probe).
    Empty,
    Message { bytes: Vec<u8>, truncated: bool },
}

impl DeliveryServer {
    /// Bind the listening socket described by `config`.
    pub async fn bind(config: TransportConfig) -> Result<Self, TransportError> {
        if config.max_message_size == 0 {
            return Err(TransportError::Config(
                "max_message_size must be at least 1 byte".into(),
            ));
        }

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
        tracing::info!("delivery server listening on {}", config.listen_addr);

        Ok(Self {
            listener,
            config,
            stats: Arc::new(ServerStats::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self, sink: Arc<dyn EventSink>) -> Result<ServerHandle, TransportError> {
        let local_addr = self.local_addr()?;
        let stats = self.stats.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(sink, shutdown_rx));

        Ok(ServerHandle {
            local_addr,
            stats,
            shutdown_tx,
            task,
        })
    }

    /// Accept connections until `shutdown` flips to `true` or its sender
    /// is dropped. In-flight connections finish on their own timeouts.
    pub async fn run(self, sink: Arc<dyn EventSink>, mut shutdown: watch::Receiver<bool>) {
        let ctx = Arc::new(ConnContext {
            config: self.config,
            stats: self.stats,
            sink,
        });

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, remote)) => {
                            ctx.stats.accepted.inc();
                            tracing::debug!("accepted connection from {remote}");
                            tokio::spawn(handle_connection(stream, remote, ctx.clone()));
                        }
                        Err(e) => {
                            tracing::warn!("accept failed: {e}");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("delivery server stopping");
                        break;
                    }
                }
            }
        }
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Stop accepting and wait for the accept loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("delivery server task ended abnormally: {e}");
        }
    }
}

/// Accepted -> Reading -> { Acknowledging -> Closed | Closed }.
///
/// The stream is dropped (closed) when this returns, whatever happened.
async fn handle_connection(mut stream: TcpStream, remote: SocketAddr, ctx: Arc<ConnContext>) {
    let source = PeerAddress::from_ip(remote.ip(), ctx.config.default_port);

    let (bytes, truncated) = match read_message(&mut stream, &ctx.config).await {
        Ok(ReadOutcome::Message { bytes, truncated }) => (bytes, truncated),
        Ok(ReadOutcome::Empty) => {
            ctx.stats.probes.inc();
            tracing::trace!("{remote} closed without payload");
            return;
        }
        Err(e) => {
            ctx.stats.read_failed.inc();
            tracing::debug!("read from {remote} failed: {e}");
            return;
        }
    };

    if truncated {
        ctx.stats.truncated.inc();
        tracing::warn!(
            "message from {remote} exceeds {} bytes, truncated",
            ctx.config.max_message_size
        );
    }

    match decode_payload(bytes, truncated) {
        Ok(payload) => {
            ctx.stats.received.inc();
            ctx.sink
                .on_inbound_message(InboundEvent::new(source, remote.port(), payload, truncated));
            write_ack(&mut stream, remote, &ctx).await;
        }
        Err(e) => {
            ctx.stats.malformed.inc();
            tracing::warn!("malformed message from {remote}: {e}");
            ctx.sink.on_malformed_inbound(&source, &e.to_string());
        }
    }

    if truncated {
        discard_excess(&mut stream, &ctx.config).await;
    }
}

/// Read one message: wait up to `read_timeout` for the first bytes, then
/// keep reading while more arrive within `drain_idle`, until end-of-stream
/// or `max_message_size`. The whole read never outlives `read_timeout`.
async fn read_message(
    stream: &mut TcpStream,
    config: &TransportConfig,
) -> std::io::Result<ReadOutcome> {
    let deadline = Instant::now() + config.read_timeout;
    let max = config.max_message_size;
    let mut buf = vec![0u8; max];

    let first = tokio::time::timeout_at(deadline, stream.read(&mut buf))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no data before read timeout"))??;
    if first == 0 {
        return Ok(ReadOutcome::Empty);
    }

    let mut filled = first;
    let mut eof = false;
    while filled < max {
        match drain_read(stream, &mut buf[filled..max], deadline, config.drain_idle).await {
            Some(0) => {
                eof = true;
                break;
            }
            Some(n) => filled += n,
            None => break,
        }
    }

    // A full buffer only counts as truncated if the peer had more to say.
    let truncated = if filled >= max && !eof {
        let mut probe = [0u8; 1];
        matches!(
            drain_read(stream, &mut probe, deadline, config.drain_idle).await,
            Some(n) if n > 0
        )
    } else {
        false
    };

    buf.truncate(filled);
    Ok(ReadOutcome::Message {
        bytes: buf,
        truncated,
    })
}

/// One read bounded by both the idle gap and the overall deadline.
/// `None` means nothing more arrived in time (or the read failed).
async fn drain_read(
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Instant,
    idle: Duration,
) -> Option<usize> {
    let until = deadline.min(Instant::now() + idle);
    match tokio::time::timeout_at(until, stream.read(buf)).await {
        Ok(Ok(n)) => Some(n),
        Ok(Err(e)) => {
            tracing::trace!("drain read failed: {e}");
            None
        }
        Err(_) => None,
    }
}

/// Decode as UTF-8. A truncated buffer may end inside a multi-byte
/// character; that partial tail is dropped rather than rejected.
fn decode_payload(bytes: Vec<u8>, truncated: bool) -> Result<String, std::str::Utf8Error> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let utf8 = e.utf8_error();
            if !truncated || utf8.error_len().is_some() {
                return Err(utf8);
            }
            let mut bytes = e.into_bytes();
            bytes.truncate(utf8.valid_up_to());
            String::from_utf8(bytes).map_err(|e| e.utf8_error())
        }
    }
}

/// Best-effort ACK. Failure is logged and counted, never escalated: the
/// message was already accepted.
async fn write_ack(stream: &mut TcpStream, remote: SocketAddr, ctx: &ConnContext) {
    let write = async {
        stream.write_all(ACK).await?;
        stream.flush().await
    };
    match tokio::time::timeout(ctx.config.write_timeout, write).await {
        Ok(Ok(())) => {
            ctx.stats.acked.inc();
            tracing::debug!("acked {remote}");
        }
        Ok(Err(e)) => {
            ctx.stats.ack_failed.inc();
            tracing::warn!("ack to {remote} failed: {e}");
        }
        Err(_) => {
            ctx.stats.ack_failed.inc();
            tracing::warn!("ack to {remote} timed out");
        }
    }
}

/// Swallow what is left of an oversized message so closing the socket
/// does not reset the connection before the peer reads the ACK.
///
/// Bounded in time only (`read_timeout`), never in bytes.
async fn discard_excess(stream: &mut TcpStream, config: &TransportConfig) {
    let deadline = Instant::now() + config.read_timeout;
    let mut scratch = [0u8; 16 * 1024];
    let mut discarded = 0usize;
    loop {
        match drain_read(stream, &mut scratch, deadline, config.drain_idle).await {
            Some(0) | None => break,
            Some(n) => discarded += n,
        }
    }
    tracing::trace!("discarded {discarded} excess bytes");
}
