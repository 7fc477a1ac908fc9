use std::time::Duration;

/// Well-known port every peer listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 12345;

/// Server read bound. Anything past it is truncated.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

/// Configuration shared by the prober, the delivery client and the server.
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use std::time::Duration;
/// use ipchat_transport::TransportConfig;
///
/// let config = TransportConfig::new()
///     .listen_addr("127.0.0.1:0")
///     .ack_timeout(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Address the delivery server binds to.
    pub(crate) listen_addr: String,
    /// Port implied by a peer address without an explicit port.
    pub(crate) default_port: u16,
    /// Connect deadline for liveness probes.
    pub(crate) probe_timeout: Duration,
    /// Connect deadline for actual deliveries.
    pub(crate) connect_timeout: Duration,
    /// How long the client waits for the `ACK` reply.
    pub(crate) ack_timeout: Duration,
    /// How long the server waits for the first payload bytes.
    pub(crate) read_timeout: Duration,
    /// Deadline for a single write (client payload, server ack).
    pub(crate) write_timeout: Duration,
    /// Once bytes have arrived, how long the server waits for more
    /// before treating the message as complete.
    pub(crate) drain_idle: Duration,
    /// Maximum inbound message size in bytes.
    pub(crate) max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfig {
    /// Create a new config with defaults.
    ///
    /// If the `IPCHAT_PORT` environment variable holds a valid port, it
    /// replaces both the listen port and the default peer port.
    pub fn new() -> Self {
        let port = std::env::var("IPCHAT_PORT")
            .ok()
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            listen_addr: format!("0.0.0.0:{port}"),
            default_port: port,
            probe_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(3),
            ack_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            drain_idle: Duration::from_millis(50),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Set the address the server binds to (default: `0.0.0.0:12345`).
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Set the port used for peers given without one (default: 12345).
    pub fn default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Set the liveness probe connect deadline (default: 1s).
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the delivery connect deadline (default: 3s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the ACK read deadline (default: 3s).
    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the server's first-byte deadline (default: 3s).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write deadline (default: 3s).
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the idle gap that ends a message (default: 50ms).
    pub fn drain_idle(mut self, idle: Duration) -> Self {
        self.drain_idle = idle;
        self
    }

    /// Set the inbound read bound (default: 4096 bytes).
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    pub fn listen(&self) -> &str {
        &self.listen_addr
    }

    pub fn port(&self) -> u16 {
        self.default_port
    }

    pub fn probe_deadline(&self) -> Duration {
        self.probe_timeout
    }

    pub fn connect_deadline(&self) -> Duration {
        self.connect_timeout
    }

    pub fn ack_deadline(&self) -> Duration {
        self.ack_timeout
    }

    pub fn max_size(&self) -> usize {
        self.max_message_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TransportConfig::new()
            .listen_addr("127.0.0.1:0")
            .default_port(4000)
            .probe_timeout(Duration::from_millis(200))
            .ack_timeout(Duration::from_millis(300))
            .max_message_size(16);

        assert_eq!(config.listen(), "127.0.0.1:0");
        assert_eq!(config.port(), 4000);
        assert_eq!(config.probe_deadline(), Duration::from_millis(200));
        assert_eq!(config.ack_deadline(), Duration::from_millis(300));
        assert_eq!(config.max_size(), 16);
    }

    #[test]
    fn defaults_match_reference_timeouts() {
        let config = TransportConfig::new();
        assert_eq!(config.probe_deadline(), Duration::from_secs(1));
        assert_eq!(config.connect_deadline(), Duration::from_secs(3));
        assert_eq!(config.max_size(), DEFAULT_MAX_MESSAGE_SIZE);
    }
}
