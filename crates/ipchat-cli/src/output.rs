use crate::events::{emit, EventInbound, EventMalformed, EventOutcome};
use crate::transcript::{inbound_line, malformed_line, outcome_lines, Transcript};
use ipchat_protocol::DispatchReport;
use ipchat_transport::{InboundEvent, OutboundMessage, PeerAddress};
use std::time::Instant;

/// Presentation of everything the user should see: a human line on
/// stderr, a JSONL event on stdout, and the transcript (if enabled).
pub struct Output {
    transcript: Option<Transcript>,
    start: Instant,
}

impl Output {
    pub fn new(transcript: Option<Transcript>) -> Self {
        Self {
            transcript,
            start: Instant::now(),
        }
    }

    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn inbound(&self, event: &InboundEvent) {
        let line = inbound_line(event);
        eprintln!("{line}");
        if event.truncated {
            eprintln!("  (message from {} was truncated)", event.source.host());
        }
        emit(&EventInbound::new(event));
        self.record(&[line]);
    }

    pub fn malformed(&self, source: &PeerAddress, error: &str) {
        let line = malformed_line(source, error);
        eprintln!("{line}");
        emit(&EventMalformed {
            event: "malformed",
            from: source.host().to_string(),
            error: error.to_string(),
        });
        self.record(&[line]);
    }

    /// One block per peer, in roster order.
    pub fn report(&self, report: &DispatchReport, message: &OutboundMessage) {
        let payload = message.wire_payload();
        let elapsed = self.elapsed_s();
        for (peer, outcome) in report {
            let lines = outcome_lines(peer, outcome, &payload);
            for line in &lines {
                eprintln!("{line}");
            }
            emit(&EventOutcome::new(peer, outcome, elapsed));
            self.record(&lines);
        }
    }

    /// Free-form system line (file errors and the like).
    pub fn note(&self, line: String) {
        eprintln!("{line}");
        self.record(&[line]);
    }

    fn record(&self, lines: &[String]) {
        if let Some(transcript) = &self.transcript {
            transcript.record_lines(lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::LOG_FILE;
    use ipchat_transport::DeliveryOutcome;

    #[test]
    fn report_writes_transcript_in_roster_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = Output::new(Some(Transcript::open(dir.path()).unwrap()));

        let report = vec![
            (PeerAddress::new("10.0.0.1", 12345), DeliveryOutcome::Delivered),
            (PeerAddress::new("10.0.0.2", 12345), DeliveryOutcome::Unreachable),
            (PeerAddress::new("10.0.0.3", 12345), DeliveryOutcome::DeliveredNoAck),
        ];
        output.report(&report, &OutboundMessage::text("alice", "hi"));

        let log = std::fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let messages: Vec<&str> = log.lines().map(|l| &l[11..]).collect();
        assert_eq!(
            messages,
            vec![
                "Delivered to 10.0.0.1",
                "You to 10.0.0.1: alice: hi",
                "[OFFLINE] 10.0.0.2 not reachable.",
                "No ACK from 10.0.0.3",
                "You to 10.0.0.3: alice: hi",
            ]
        );
    }
}
