use ipchat_transport::{DeliveryOutcome, InboundEvent, PeerAddress};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const LOG_FILE: &str = "chat.log";
pub const HISTORY_FILE: &str = "chat_history.json";

/// Append-only conversation record.
///
/// Every line goes to `chat.log` as `[HH:MM:SS] line` and to
/// `chat_history.json` as one JSON object per line.
pub struct Transcript {
    log: PathBuf,
    history: PathBuf,
    lock: Mutex<()>,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    timestamp: &'a str,
    message: &'a str,
}

impl Transcript {
    /// Use `dir` for both files, creating it if needed.
    pub fn open(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            log: dir.join(LOG_FILE),
            history: dir.join(HISTORY_FILE),
            lock: Mutex::new(()),
        })
    }

    pub fn record(&self, line: &str) -> io::Result<()> {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        let entry = serde_json::to_string(&HistoryEntry {
            timestamp: &timestamp,
            message: line,
        })?;

        let _guard = self.lock.lock().map_err(|_| io::Error::other("transcript lock poisoned"))?;
        let mut log = OpenOptions::new().create(true).append(true).open(&self.log)?;
        writeln!(log, "[{timestamp}] {line}")?;
        let mut history = OpenOptions::new().create(true).append(true).open(&self.history)?;
        writeln!(history, "{entry}")?;
        Ok(())
    }

    /// Record each line. I/O errors are logged, not returned.
    pub fn record_lines(&self, lines: &[String]) {
        for line in lines {
            if let Err(e) = self.record(line) {
                tracing::warn!("transcript write failed: {e}");
                return;
            }
        }
    }
}

// ── Line formats ────────────────────────────────────────────────

pub fn inbound_line(event: &InboundEvent) -> String {
    format!("{} says: {}", event.source.host(), event.payload)
}

pub fn malformed_line(source: &PeerAddress, error: &str) -> String {
    format!("[MALFORMED from {}] {error}", source.host())
}

/// Lines for one outcome. A payload that left this host is also echoed
/// back as `You to <ip>: <payload>`.
pub fn outcome_lines(peer: &PeerAddress, outcome: &DeliveryOutcome, payload: &str) -> Vec<String> {
    let ip = peer.host();
    match outcome {
        DeliveryOutcome::Delivered => vec![
            format!("Delivered to {ip}"),
            format!("You to {ip}: {payload}"),
        ],
        DeliveryOutcome::DeliveredNoAck => vec![
            format!("No ACK from {ip}"),
            format!("You to {ip}: {payload}"),
        ],
        DeliveryOutcome::Unreachable => vec![format!("[OFFLINE] {ip} not reachable.")],
        DeliveryOutcome::SendFailed(reason) => vec![format!("[SEND ERROR to {ip}] {reason}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_appends_to_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = Transcript::open(dir.path()).unwrap();

        transcript.record("10.0.0.2 says: alice: hi").unwrap();
        transcript.record("Delivered to 10.0.0.2").unwrap();

        let log = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert_eq!(&lines[0][9..], "] 10.0.0.2 says: alice: hi");
        assert!(lines[1].ends_with("] Delivered to 10.0.0.2"));

        let history = fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        let entries: Vec<serde_json::Value> = history
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["message"], "Delivered to 10.0.0.2");
        assert_eq!(entries[1]["timestamp"].as_str().unwrap().len(), 8);
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("today");
        let transcript = Transcript::open(&nested).unwrap();
        transcript.record_lines(&["hello".to_string()]);
        assert!(nested.join(LOG_FILE).exists());
    }

    #[test]
    fn outcome_line_formats() {
        let peer = PeerAddress::new("10.0.0.3", 12345);
        assert_eq!(
            outcome_lines(&peer, &DeliveryOutcome::Delivered, "alice: hi"),
            vec!["Delivered to 10.0.0.3", "You to 10.0.0.3: alice: hi"]
        );
        assert_eq!(
            outcome_lines(&peer, &DeliveryOutcome::DeliveredNoAck, "alice: hi"),
            vec!["No ACK from 10.0.0.3", "You to 10.0.0.3: alice: hi"]
        );
        assert_eq!(
            outcome_lines(&peer, &DeliveryOutcome::Unreachable, "alice: hi"),
            vec!["[OFFLINE] 10.0.0.3 not reachable."]
        );
        assert_eq!(
            outcome_lines(&peer, &DeliveryOutcome::SendFailed("refused".into()), "x"),
            vec!["[SEND ERROR to 10.0.0.3] refused"]
        );
    }

    #[test]
    fn inbound_line_uses_source_ip() {
        let source = PeerAddress::new("192.168.1.7", 12345);
        let event = InboundEvent::new(source, 50123, "bob: yo".into(), false);
        assert_eq!(inbound_line(&event), "192.168.1.7 says: bob: yo");
    }
}
