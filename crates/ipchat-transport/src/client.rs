use crate::config::TransportConfig;
use crate::message::{OutboundMessage, ACK};
use crate::{DeliveryOutcome, PeerAddress};

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Deliver `message` to `peer` over a fresh connection.
///
/// One connection carries exactly one message: connect, write the whole
/// payload, half-close, then wait for `ACK`. A single attempt is
/// definitive. The connection is closed on every path (dropped).
pub async fn deliver(
    peer: &PeerAddress,
    message: &OutboundMessage,
    config: &TransportConfig,
) -> DeliveryOutcome {
    deliver_payload(peer, message.wire_payload().as_bytes(), config).await
}

/// Deliver raw payload bytes. See [`deliver`].
pub async fn deliver_payload(
    peer: &PeerAddress,
    payload: &[u8],
    config: &TransportConfig,
) -> DeliveryOutcome {
    let connect = TcpStream::connect(peer.connect_target());
    let mut stream = match tokio::time::timeout(config.connect_timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return DeliveryOutcome::SendFailed(format!("connect: {e}")),
        Err(_) => {
            return DeliveryOutcome::SendFailed(format!(
                "connect timed out after {:?}",
                config.connect_timeout
            ))
        }
    };

    match tokio::time::timeout(config.write_timeout, stream.write_all(payload)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return DeliveryOutcome::SendFailed(format!("write: {e}")),
        Err(_) => {
            return DeliveryOutcome::SendFailed(format!(
                "write timed out after {:?}",
                config.write_timeout
            ))
        }
    }

    // End-of-stream marks the message boundary for the peer.
    if let Err(e) = stream.shutdown().await {
        tracing::debug!("half-close to {peer} failed: {e}");
    }

    match read_ack(&mut stream, config.ack_timeout).await {
        Ok(reply) if reply == ACK => {
            tracing::debug!("delivered to {peer}");
            DeliveryOutcome::Delivered
        }
        Ok(reply) => {
            tracing::debug!(
                "no ack from {peer}: got {:?}",
                String::from_utf8_lossy(&reply)
            );
            DeliveryOutcome::DeliveredNoAck
        }
        Err(reason) => {
            tracing::debug!("no ack from {peer}: {reason}");
            DeliveryOutcome::DeliveredNoAck
        }
    }
}

/// Read the peer's reply: stops at end-of-stream or once at least
/// `ACK.len()` bytes are in, whichever comes first.
async fn read_ack(stream: &mut TcpStream, deadline: Duration) -> Result<Vec<u8>, String> {
    let mut reply = Vec::with_capacity(16);
    let mut chunk = [0u8; 64];

    let read = tokio::time::timeout(deadline, async {
        while reply.len() < ACK.len() {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            reply.extend_from_slice(&chunk[..n]);
        }
        Ok::<(), std::io::Error>(())
    })
    .await;

    match read {
        Ok(Ok(())) => Ok(reply),
        Ok(Err(e)) => Err(format!("read: {e}")),
        Err(_) => Err(format!("timed out after {deadline:?}")),
    }
}
