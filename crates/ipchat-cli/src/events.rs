use ipchat_metrics::{DeliverySnapshot, ServerSnapshot};
use ipchat_transport::{DeliveryOutcome, InboundEvent, PeerAddress};
use serde::Serialize;
use std::io::Write;

/// Emit a JSONL event to stdout (flushed immediately for piped output).
pub fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{json}");
        let _ = lock.flush();
    }
}

pub use ipchat_transport::now_ms;

// ── Session events ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventStarted {
    pub event: &'static str,
    pub name: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    pub timestamp: u64,
}

impl EventStarted {
    pub fn new(name: &str, mode: &str, listen: Option<String>) -> Self {
        Self {
            event: "started",
            name: name.to_string(),
            mode: mode.to_string(),
            listen,
            timestamp: now_ms(),
        }
    }
}

// ── Inbound ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventInbound<'a> {
    pub event: &'static str,
    pub id: String,
    pub from: String,
    pub payload: &'a str,
    pub truncated: bool,
    pub received_at: u64,
}

impl<'a> EventInbound<'a> {
    pub fn new(inbound: &'a InboundEvent) -> Self {
        Self {
            event: "inbound",
            id: inbound.id.clone(),
            from: inbound.source.host().to_string(),
            payload: &inbound.payload,
            truncated: inbound.truncated,
            received_at: inbound.received_at,
        }
    }
}

#[derive(Serialize)]
pub struct EventMalformed {
    pub event: &'static str,
    pub from: String,
    pub error: String,
}

// ── Outbound ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventOutcome<'a> {
    pub event: &'static str,
    pub peer: String,
    #[serde(flatten)]
    pub outcome: &'a DeliveryOutcome,
    pub elapsed_s: f64,
}

impl<'a> EventOutcome<'a> {
    pub fn new(peer: &PeerAddress, outcome: &'a DeliveryOutcome, elapsed_s: f64) -> Self {
        Self {
            event: "outcome",
            peer: peer.to_string(),
            outcome,
            elapsed_s,
        }
    }
}

#[derive(Serialize)]
pub struct EventProbe {
    pub event: &'static str,
    pub peer: String,
    pub online: bool,
}

#[derive(Serialize)]
pub struct EventGroup {
    pub event: &'static str,
    pub name: String,
    pub members: Vec<String>,
}

// ── Summary ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventSummary {
    pub event: &'static str,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliverySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSnapshot>,
    pub elapsed_s: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_event_flattens_kind_and_reason() {
        let peer = PeerAddress::new("10.0.0.2", 12345);
        let outcome = DeliveryOutcome::SendFailed("connect: refused".into());
        let json = serde_json::to_value(EventOutcome::new(&peer, &outcome, 0.5)).unwrap();

        assert_eq!(json["event"], "outcome");
        assert_eq!(json["peer"], "10.0.0.2:12345");
        assert_eq!(json["kind"], "send_failed");
        assert_eq!(json["reason"], "connect: refused");
    }

    #[test]
    fn summary_skips_missing_sections() {
        let summary = EventSummary {
            event: "summary",
            mode: "send".into(),
            delivery: Some(DeliverySnapshot {
                delivered: 2,
                ..Default::default()
            }),
            server: None,
            elapsed_s: 1.0,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["delivery"]["delivered"], 2);
        assert!(json.get("server").is_none());
    }
}
