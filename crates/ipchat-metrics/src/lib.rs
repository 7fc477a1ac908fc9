//! Counters for the IPChat delivery stack.
//!
//! [`Counter`] is a relaxed atomic tally. [`ServerStats`] and
//! [`DeliveryStats`] group the counters the server and the dispatcher
//! keep; both can be read as plain serializable snapshots.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter backed by [`AtomicU64`].
///
/// Relaxed ordering only: values are statistics, never synchronization.
#[derive(Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Counter").field(&self.get()).finish()
    }
}

impl Serialize for Counter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

/// Per-connection tallies kept by the delivery server.
#[derive(Debug, Default, Serialize)]
pub struct ServerStats {
    /// Connections accepted by the listener.
    pub accepted: Counter,
    /// Connections closed without sending any bytes (liveness probes).
    pub probes: Counter,
    /// Messages decoded and handed to the event sink.
    pub received: Counter,
    /// ACK replies written successfully.
    pub acked: Counter,
    /// ACK replies that could not be written.
    pub ack_failed: Counter,
    /// Reads that failed or timed out before any byte arrived.
    pub read_failed: Counter,
    /// Payloads that were not valid UTF-8.
    pub malformed: Counter,
    /// Payloads cut at the read bound.
    pub truncated: Counter,
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServerSnapshot {
    pub accepted: u64,
    pub probes: u64,
    pub received: u64,
    pub acked: u64,
    pub ack_failed: u64,
    pub read_failed: u64,
    pub malformed: u64,
    pub truncated: u64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            accepted: self.accepted.get(),
            probes: self.probes.get(),
            received: self.received.get(),
            acked: self.acked.get(),
            ack_failed: self.ack_failed.get(),
            read_failed: self.read_failed.get(),
            malformed: self.malformed.get(),
            truncated: self.truncated.get(),
        }
    }
}

/// Outcome tallies kept by the fan-out dispatcher.
#[derive(Debug, Default, Serialize)]
pub struct DeliveryStats {
    pub delivered: Counter,
    pub delivered_no_ack: Counter,
    pub unreachable: Counter,
    pub send_failed: Counter,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySnapshot {
    pub delivered: u64,
    pub delivered_no_ack: u64,
    pub unreachable: u64,
    pub send_failed: u64,
}

impl DeliverySnapshot {
    /// Every attempt, whatever its outcome.
    pub fn total(&self) -> u64 {
        self.delivered + self.delivered_no_ack + self.unreachable + self.send_failed
    }
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            delivered: self.delivered.get(),
            delivered_no_ack: self.delivered_no_ack.get(),
            unreachable: self.unreachable.get(),
            send_failed: self.send_failed.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_basics() {
        let c = Counter::new();
        assert_eq!(c.get(), 0);
        c.inc();
        c.inc();
        assert_eq!(c.get(), 2);
    }

    #[test]
    fn counter_serializes_as_number() {
        let c = Counter::default();
        c.inc();
        assert_eq!(serde_json::to_string(&c).unwrap(), "1");
    }

    #[test]
    fn server_snapshot_reflects_counters() {
        let stats = ServerStats::new();
        stats.accepted.inc();
        stats.accepted.inc();
        stats.acked.inc();
        stats.malformed.inc();

        let snap = stats.snapshot();
        assert_eq!(snap.accepted, 2);
        assert_eq!(snap.acked, 1);
        assert_eq!(snap.malformed, 1);
        assert_eq!(snap.received, 0);
    }

    #[test]
    fn delivery_snapshot_total() {
        let stats = DeliveryStats::new();
        stats.delivered.inc();
        stats.unreachable.inc();
        stats.send_failed.inc();
        let snap = stats.snapshot();
        assert_eq!(snap.total(), 3);
        assert_eq!(snap.delivered_no_ack, 0);
    }

    #[test]
    fn counters_are_shared_across_threads() {
        let stats = std::sync::Arc::new(ServerStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        stats.accepted.inc();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.snapshot().accepted, 1000);
    }
}
