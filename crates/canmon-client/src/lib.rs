//! Streaming client for the CAN telemetry monitor.
//!
//! [`ConnectionManager`] owns one channel attempt, [`submit_frame`] handles
//! outgoing frames, and [`Monitor`] supervises reconnection while exposing
//! the session read model through a [`SessionHandle`].

#![deny(unsafe_code)]

pub mod backoff;
pub mod connection;
pub mod endpoint;
pub mod handle;
pub mod monitor;
pub mod submit;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::Backoff;
pub use connection::{ConnectionManager, SendError};
pub use endpoint::{Endpoint, CHANNEL_PATH};
pub use handle::SessionHandle;
pub use monitor::{Monitor, MonitorConfig, MonitorHandle};
pub use submit::submit_frame;
pub use transport::{Channel, ChannelEvent, ChannelPeer, ConnectError, Connector, WsConnector};
