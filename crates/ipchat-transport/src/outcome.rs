use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal classification of one send attempt to one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Payload written and the peer answered `ACK`.
    Delivered,
    /// Payload written, but the ACK was missing, late or malformed.
    /// The peer may still have received the message.
    DeliveredNoAck,
    /// Liveness probe failed; no send was attempted.
    Unreachable,
    /// Connect or write failed.
    SendFailed(String),
}

impl DeliveryOutcome {
    /// Whether the payload left this host (with or without ACK).
    pub fn was_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered | DeliveryOutcome::DeliveredNoAck)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => write!(f, "delivered"),
            DeliveryOutcome::DeliveredNoAck => write!(f, "sent, no ack"),
            DeliveryOutcome::Unreachable => write!(f, "unreachable"),
            DeliveryOutcome::SendFailed(reason) => write!(f, "send failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sent_classification() {
        assert!(DeliveryOutcome::Delivered.was_sent());
        assert!(DeliveryOutcome::DeliveredNoAck.was_sent());
        assert!(!DeliveryOutcome::Unreachable.was_sent());
        assert!(!DeliveryOutcome::SendFailed("refused".into()).was_sent());
        assert!(!DeliveryOutcome::DeliveredNoAck.is_delivered());
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_value(DeliveryOutcome::SendFailed("refused".into())).unwrap();
        assert_eq!(json["kind"], "send_failed");
        assert_eq!(json["reason"], "refused");

        let json = serde_json::to_value(DeliveryOutcome::Delivered).unwrap();
        assert_eq!(json["kind"], "delivered");
    }

    #[test]
    fn display() {
        assert_eq!(
            DeliveryOutcome::SendFailed("connection refused".into()).to_string(),
            "send failed: connection refused"
        );
        assert_eq!(DeliveryOutcome::DeliveredNoAck.to_string(), "sent, no ack");
    }
}
