use crate::{DeliveryOutcome, InboundEvent, PeerAddress};

use tokio::sync::mpsc;

/// Receiver of everything the core reports to the presentation layer.
///
/// Called from server and dispatcher tasks. Implementations must return
/// promptly: hand the event off, never process it inline.
pub trait EventSink: Send + Sync {
    /// A message arrived on the delivery server.
    fn on_inbound_message(&self, event: InboundEvent);

    /// One peer's send attempt finished.
    fn on_delivery_outcome(&self, peer: &PeerAddress, outcome: &DeliveryOutcome);

    /// An accepted connection carried bytes that were not valid UTF-8.
    fn on_malformed_inbound(&self, _source: &PeerAddress, _error: &str) {}
}

/// Event forwarded by [`ChannelSink`].
#[derive(Debug, Clone)]
pub enum CoreEvent {
    Inbound(InboundEvent),
    Outcome {
        peer: PeerAddress,
        outcome: DeliveryOutcome,
    },
    Malformed {
        source: PeerAddress,
        error: String,
    },
}

/// Sink that pushes every event into an unbounded channel.
///
/// Sending never waits, so a slow consumer cannot stall the server.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: CoreEvent) {
        // Receiver gone means nobody is listening anymore.
        if self.tx.send(event).is_err() {
            tracing::trace!("event sink closed, dropping event");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_inbound_message(&self, event: InboundEvent) {
        self.forward(CoreEvent::Inbound(event));
    }

    fn on_delivery_outcome(&self, peer: &PeerAddress, outcome: &DeliveryOutcome) {
        self.forward(CoreEvent::Outcome {
            peer: peer.clone(),
            outcome: outcome.clone(),
        });
    }

    fn on_malformed_inbound(&self, source: &PeerAddress, error: &str) {
        self.forward(CoreEvent::Malformed {
            source: source.clone(),
            error: error.to_string(),
        });
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_inbound_message(&self, _event: InboundEvent) {}
    fn on_delivery_outcome(&self, _peer: &PeerAddress, _outcome: &DeliveryOutcome) {}
}
