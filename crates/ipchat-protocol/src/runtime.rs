//! Chat runtime: one delivery server plus one dispatcher behind a handle.
//!
//! The server accepts on its own task; sends run on the caller's task, so
//! a slow fan-out never stalls inbound traffic. Everything observable
//! (inbound messages, delivery outcomes, malformed input) comes out of a
//! single event channel.

use std::net::SocketAddr;
use std::sync::Arc;

use ipchat_metrics::{DeliveryStats, ServerStats};
use ipchat_transport::{
    ChannelSink, CoreEvent, DeliveryServer, OutboundMessage, ServerHandle,
    TransportConfig,
};
use tokio::sync::{mpsc, Mutex};

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::roster::GroupRoster;
use crate::transport::{PeerTransport, TcpTransport};
use crate::ProtocolError;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for the chat runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Listener and client timeouts.
    pub transport: TransportConfig,
    /// Deliver to group members in parallel.
    pub concurrent_fanout: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::new(),
            concurrent_fanout: true,
        }
    }
}

// ── Handle + channels ─────────────────────────────────────────────────

/// Cheap-to-clone handle for sending and inspecting the runtime.
#[derive(Clone)]
pub struct RuntimeHandle {
    dispatcher: Arc<Dispatcher>,
    transport: Arc<TcpTransport>,
    roster: Arc<dyn GroupRoster>,
    local_addr: SocketAddr,
    server_stats: Arc<ServerStats>,
    server: Arc<Mutex<Option<ServerHandle>>>,
}

/// Returned by [`ChatRuntime::start`].
pub struct RuntimeChannels {
    pub handle: RuntimeHandle,
    pub events: mpsc::UnboundedReceiver<CoreEvent>,
}

pub struct ChatRuntime;

impl ChatRuntime {
    /// Bind the delivery server and wire the dispatcher to the same sink.
    pub async fn start(
        config: RuntimeConfig,
        roster: Arc<dyn GroupRoster>,
    ) -> Result<RuntimeChannels, ProtocolError> {
        let (sink, events) = ChannelSink::channel();
        let sink = Arc::new(sink);

        let server = DeliveryServer::bind(config.transport.clone())
            .await?
            .spawn(sink.clone())?;
        let local_addr = server.local_addr();
        let server_stats = server.stats();

        let transport = Arc::new(TcpTransport::new(config.transport));
        let dispatcher = Dispatcher::new(transport.clone(), roster.clone(), sink)
            .with_concurrency(config.concurrent_fanout);

        tracing::info!("chat runtime started on {local_addr}");
        Ok(RuntimeChannels {
            handle: RuntimeHandle {
                dispatcher: Arc::new(dispatcher),
                transport,
                roster,
                local_addr,
                server_stats,
                server: Arc::new(Mutex::new(Some(server))),
            },
            events,
        })
    }
}

impl RuntimeHandle {
    /// Send to an address or `group:<name>`.
    pub async fn send(
        &self,
        target: &str,
        message: &OutboundMessage,
    ) -> Result<DispatchReport, ProtocolError> {
        self.dispatcher
            .dispatch_str(target, self.default_port(), message)
            .await
    }

    /// Probe a single address.
    pub async fn probe(&self, target: &str) -> Result<bool, ProtocolError> {
        let peer = ipchat_transport::PeerAddress::parse(target, self.default_port())
            .map_err(ProtocolError::InvalidDestination)?;
        Ok(self.transport.probe(&peer).await)
    }

    pub fn group_names(&self) -> Result<Vec<String>, ProtocolError> {
        self.roster.group_names()
    }

    pub fn default_port(&self) -> u16 {
        self.transport.config().port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn server_stats(&self) -> Arc<ServerStats> {
        self.server_stats.clone()
    }

    pub fn delivery_stats(&self) -> Arc<DeliveryStats> {
        self.dispatcher.stats()
    }

    /// Stop the delivery server. Idempotent; sending keeps working.
    pub async fn shutdown(&self) {
        let server = self.server.lock().await.take();
        if let Some(server) = server {
            server.shutdown().await;
            tracing::info!("chat runtime stopped");
        }
    }
}
