use crate::PeerAddress;

use std::time::Duration;
use tokio::net::TcpStream;

/// Check whether `peer` accepts TCP connections within `timeout`.
///
/// The probe connection carries no data and is closed right away; it is
/// never reused for the delivery that may follow. Any failure (refused,
/// timed out, unreachable, DNS) reads as `false`.
pub async fn probe(peer: &PeerAddress, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(peer.connect_target())).await {
        Ok(Ok(stream)) => {
            drop(stream);
            tracing::debug!("probe {peer}: online");
            true
        }
        Ok(Err(e)) => {
            tracing::debug!("probe {peer}: {e}");
            false
        }
        Err(_) => {
            tracing::debug!("probe {peer}: timed out after {timeout:?}");
            false
        }
    }
}
