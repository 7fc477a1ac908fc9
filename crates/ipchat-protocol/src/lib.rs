//! IPChat protocol layer.
//!
//! Turns a destination (one address or `group:<name>`) into per-peer
//! delivery attempts: resolve through a [`GroupRoster`], probe each peer,
//! deliver to the ones that answered, report one
//! [`DeliveryOutcome`](ipchat_transport::DeliveryOutcome) per peer.
//!
//! [`ChatRuntime`] bundles a delivery server and a [`Dispatcher`] behind a
//! single event channel for applications.

pub mod dispatcher;
pub mod error;
pub mod roster;
pub mod runtime;
pub mod transport;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::ProtocolError;
pub use roster::{GroupRoster, JsonFileRoster, StaticRoster};
pub use runtime::{ChatRuntime, RuntimeChannels, RuntimeConfig, RuntimeHandle};
pub use transport::{PeerTransport, TcpTransport};
