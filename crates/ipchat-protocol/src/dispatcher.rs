//! Fan-out dispatcher: resolve a destination, probe each peer, deliver.
//!
//! One attempt per resolved peer, no retry. Per-peer failures never abort
//! the rest of the fan-out; only an unknown group fails the whole call.

use std::sync::Arc;

use ipchat_metrics::DeliveryStats;
use ipchat_transport::{DeliveryOutcome, Destination, EventSink, OutboundMessage, PeerAddress};

use crate::roster::GroupRoster;
use crate::transport::PeerTransport;
use crate::ProtocolError;

/// Outcomes of one dispatch, in roster order.
pub type DispatchReport = Vec<(PeerAddress, DeliveryOutcome)>;

pub struct Dispatcher {
    transport: Arc<dyn PeerTransport>,
    roster: Arc<dyn GroupRoster>,
    reporter: Reporter,
    concurrent: bool,
}

/// Where every outcome goes as soon as it is known.
#[derive(Clone)]
struct Reporter {
    sink: Arc<dyn EventSink>,
    stats: Arc<DeliveryStats>,
}

impl Reporter {
    fn report(&self, peer: &PeerAddress, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.stats.delivered.inc(),
            DeliveryOutcome::DeliveredNoAck => self.stats.delivered_no_ack.inc(),
            DeliveryOutcome::Unreachable => self.stats.unreachable.inc(),
            DeliveryOutcome::SendFailed(_) => self.stats.send_failed.inc(),
        }
        tracing::debug!("{peer}: {outcome}");
        self.sink.on_delivery_outcome(peer, outcome);
    }
}

impl Dispatcher {
    /// Concurrent fan-out by default.
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        roster: Arc<dyn GroupRoster>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            roster,
            reporter: Reporter {
                sink,
                stats: Arc::new(DeliveryStats::new()),
            },
            concurrent: true,
        }
    }

    /// Deliver to group members one after another instead of in parallel.
    pub fn sequential(mut self) -> Self {
        self.concurrent = false;
        self
    }

    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn stats(&self) -> Arc<DeliveryStats> {
        self.reporter.stats.clone()
    }

    /// Peers a destination expands to. Group members keep roster order;
    /// a peer listed twice is only contacted once.
    pub fn resolve(&self, destination: &Destination) -> Result<Vec<PeerAddress>, ProtocolError> {
        match destination {
            Destination::Direct(peer) => Ok(vec![peer.clone()]),
            Destination::Group(name) => {
                let members = self
                    .roster
                    .lookup_group(name)?
                    .ok_or_else(|| {
                        tracing::warn!("group {name} not found, nothing sent");
                        ProtocolError::GroupNotFound(name.clone())
                    })?;
                let mut peers: Vec<PeerAddress> = Vec::with_capacity(members.len());
                for member in members {
                    if peers.contains(&member) {
                        tracing::debug!("group {name}: skipping duplicate member {member}");
                        continue;
                    }
                    peers.push(member);
                }
                Ok(peers)
            }
        }
    }

    /// Send `message` to every peer `destination` resolves to.
    ///
    /// Returns exactly one outcome per resolved peer, in roster order,
    /// whatever order the attempts complete in.
    pub async fn dispatch(
        &self,
        destination: &Destination,
        message: &OutboundMessage,
    ) -> Result<DispatchReport, ProtocolError> {
        let peers = self.resolve(destination)?;
        if let Destination::Group(name) = destination {
            tracing::info!("sending to group {name} ({} members)", peers.len());
        }

        if !self.concurrent || peers.len() <= 1 {
            let mut report = Vec::with_capacity(peers.len());
            for peer in peers {
                let outcome = send_one(self.transport.as_ref(), &peer, message).await;
                self.reporter.report(&peer, &outcome);
                report.push((peer, outcome));
            }
            return Ok(report);
        }

        let message = Arc::new(message.clone());
        let tasks: Vec<_> = peers
            .into_iter()
            .map(|peer| {
                let transport = self.transport.clone();
                let reporter = self.reporter.clone();
                let message = message.clone();
                let task_peer = peer.clone();
                let task = tokio::spawn(async move {
                    let outcome = send_one(transport.as_ref(), &task_peer, &message).await;
                    reporter.report(&task_peer, &outcome);
                    outcome
                });
                (peer, task)
            })
            .collect();

        let mut report = Vec::with_capacity(tasks.len());
        for (peer, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("delivery task for {peer} failed: {e}");
                    let outcome = DeliveryOutcome::SendFailed(format!("delivery task failed: {e}"));
                    self.reporter.report(&peer, &outcome);
                    outcome
                }
            };
            report.push((peer, outcome));
        }
        Ok(report)
    }

    /// Parse `target` (address or `group:<name>`) and dispatch.
    pub async fn dispatch_str(
        &self,
        target: &str,
        default_port: u16,
        message: &OutboundMessage,
    ) -> Result<DispatchReport, ProtocolError> {
        let destination = Destination::parse(target, default_port)
            .map_err(ProtocolError::InvalidDestination)?;
        self.dispatch(&destination, message).await
    }
}

/// Probe, then deliver only if the peer answered.
async fn send_one(
    transport: &dyn PeerTransport,
    peer: &PeerAddress,
    message: &OutboundMessage,
) -> DeliveryOutcome {
    if !transport.probe(peer).await {
        tracing::debug!("{peer} did not answer probe");
        return DeliveryOutcome::Unreachable;
    }
    transport.deliver(peer, message).await
}
