/// Protocol-level errors for IPChat.
///
/// Only destination resolution fails a whole dispatch; per-peer problems
/// are reported as [`DeliveryOutcome`](ipchat_transport::DeliveryOutcome)s.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Transport(#[from] ipchat_transport::TransportError),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("roster {path}: {reason}")]
    Roster { path: String, reason: String },

    #[error("invalid destination: {0}")]
    InvalidDestination(#[source] ipchat_transport::TransportError),
}
