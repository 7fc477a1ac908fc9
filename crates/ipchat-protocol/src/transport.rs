use ipchat_transport::{DeliveryOutcome, OutboundMessage, PeerAddress, TransportConfig};

/// Network seam for the dispatcher.
///
/// Production: [`TcpTransport`] (one TCP connection per message).
/// Tests: `MockTransport` (scripted per-peer behavior, records calls).
#[async_trait::async_trait]
pub trait PeerTransport: Send + Sync {
    /// Liveness check. `false` on any failure or timeout.
    async fn probe(&self, peer: &PeerAddress) -> bool;

    /// Single delivery attempt. Never errors; the outcome says what happened.
    async fn deliver(&self, peer: &PeerAddress, message: &OutboundMessage) -> DeliveryOutcome;
}

// ── TcpTransport (production) ───────────────────────────────────────

/// [`PeerTransport`] over plain TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: TransportConfig,
}

impl TcpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl PeerTransport for TcpTransport {
    async fn probe(&self, peer: &PeerAddress) -> bool {
        ipchat_transport::probe(peer, self.config.probe_deadline()).await
    }

    async fn deliver(&self, peer: &PeerAddress, message: &OutboundMessage) -> DeliveryOutcome {
        ipchat_transport::deliver(peer, message, &self.config).await
    }
}

// ── MockTransport (tests) ───────────────────────────────────────────
