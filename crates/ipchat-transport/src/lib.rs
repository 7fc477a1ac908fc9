//! IPChat transport layer.
//!
//! Plain TCP, one message per connection: the sender connects, writes a
//! UTF-8 payload, half-closes, and waits for the literal bytes `ACK`.
//! No framing, no length prefix; the server reads up to a fixed bound and
//! truncates anything beyond it.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ipchat_transport::{
//!     deliver, probe, ChannelSink, DeliveryServer, OutboundMessage, PeerAddress, TransportConfig,
//! };
//!
//! # async fn example() -> Result<(), ipchat_transport::TransportError> {
//! let config = TransportConfig::new();
//!
//! // Receive
//! let (sink, mut events) = ChannelSink::channel();
//! let server = DeliveryServer::bind(config.clone()).await?.spawn(Arc::new(sink))?;
//!
//! // Send
//! let peer: PeerAddress = "192.168.1.20".parse()?;
//! if probe(&peer, config.probe_deadline()).await {
//!     let outcome = deliver(&peer, &OutboundMessage::text("alice", "hi!"), &config).await;
//!     println!("{peer}: {outcome}");
//! }
//!
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod events;
mod message;
mod outcome;
mod peer;
mod probe;
mod server;

pub use client::{deliver, deliver_payload};
pub use config::{TransportConfig, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_PORT};
pub use error::TransportError;
pub use events::{ChannelSink, CoreEvent, EventSink, NullSink};
pub use message::{now_ms, InboundEvent, OutboundMessage, ACK, ANONYMOUS};
pub use outcome::DeliveryOutcome;
pub use peer::{Destination, PeerAddress, GROUP_PREFIX};
pub use probe::probe;
pub use server::{DeliveryServer, ServerHandle};

pub use ipchat_metrics::{ServerSnapshot, ServerStats};
