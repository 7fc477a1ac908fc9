use crate::PeerAddress;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Literal reply a server writes after accepting a message.
pub const ACK: &[u8] = b"ACK";

/// Sender name used when none (or only whitespace) is given.
pub const ANONYMOUS: &str = "Anonymous";

/// An outbound chat message or text-file transfer.
///
/// Both kinds go out as opaque UTF-8 text; see [`wire_payload`](Self::wire_payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub sender_name: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
}

impl OutboundMessage {
    /// A plain text message.
    pub fn text(sender_name: &str, body: impl Into<String>) -> Self {
        Self {
            sender_name: normalize_sender(sender_name),
            body: body.into(),
            attachment_name: None,
        }
    }

    /// A text-file transfer with an explicit attachment name.
    pub fn file(sender_name: &str, attachment_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender_name: normalize_sender(sender_name),
            body: body.into(),
            attachment_name: Some(attachment_name.into()),
        }
    }

    /// Read a UTF-8 text file; its file name becomes the attachment name.
    pub fn from_text_file(sender_name: &str, path: &Path) -> std::io::Result<Self> {
        let body = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::file(sender_name, name, body))
    }

    /// Text that goes on the wire.
    ///
    /// `name: body` for messages, `name (file: x.txt):\nbody` for files.
    pub fn wire_payload(&self) -> String {
        match &self.attachment_name {
            Some(file) => format!("{} (file: {}):\n{}", self.sender_name, file, self.body),
            None => format!("{}: {}", self.sender_name, self.body),
        }
    }

    pub fn is_file(&self) -> bool {
        self.attachment_name.is_some()
    }
}

fn normalize_sender(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        ANONYMOUS.to_string()
    } else {
        trimmed.to_string()
    }
}

/// One message received by the delivery server.
///
/// Emitted once per accepted connection whose payload decoded as UTF-8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Unique event identifier (UUID v4), for transcript correlation.
    pub id: String,
    /// Sender's host on the well-known port (reply address).
    pub source: PeerAddress,
    /// Remote (ephemeral) port of the connection.
    pub remote_port: u16,
    /// Decoded payload text.
    pub payload: String,
    /// Whether bytes past the read bound were dropped.
    pub truncated: bool,
    /// Unix timestamp in milliseconds.
    pub received_at: u64,
}

impl InboundEvent {
    pub fn new(source: PeerAddress, remote_port: u16, payload: String, truncated: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            remote_port,
            payload,
            truncated,
            received_at: now_ms(),
        }
    }
}

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_payload() {
        let msg = OutboundMessage::text("alice", "hello there");
        assert_eq!(msg.wire_payload(), "alice: hello there");
        assert!(!msg.is_file());
    }

    #[test]
    fn file_payload() {
        let msg = OutboundMessage::file("bob", "notes.txt", "line 1\nline 2");
        assert_eq!(msg.wire_payload(), "bob (file: notes.txt):\nline 1\nline 2");
        assert!(msg.is_file());
    }

    #[test]
    fn blank_sender_is_anonymous() {
        let msg = OutboundMessage::text("   ", "hi");
        assert_eq!(msg.wire_payload(), "Anonymous: hi");
    }

    #[test]
    fn from_text_file_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.txt");
        std::fs::write(&path, "buy milk").unwrap();

        let msg = OutboundMessage::from_text_file("carol", &path).unwrap();
        assert_eq!(msg.attachment_name.as_deref(), Some("todo.txt"));
        assert_eq!(msg.wire_payload(), "carol (file: todo.txt):\nbuy milk");
    }

    #[test]
    fn from_text_file_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(OutboundMessage::from_text_file("carol", &path).is_err());
    }

    #[test]
    fn inbound_event_ids_are_unique() {
        let src = PeerAddress::new("127.0.0.1", 12345);
        let a = InboundEvent::new(src.clone(), 50000, "x".into(), false);
        let b = InboundEvent::new(src, 50001, "x".into(), false);
        assert_ne!(a.id, b.id);
        assert!(a.received_at > 0);
    }
}
