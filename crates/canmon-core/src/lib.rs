//! Core state model of the CAN telemetry monitor.
//!
//! Everything in this crate is synchronous and transport-free: frames, the
//! bounded history, inbound message classification and the session object
//! that applies their effects. The client crate drives it from a channel.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod frame;
pub mod history;
pub mod message;
pub mod session;
pub mod state;

pub use errors::{MonitorError, Result};
pub use events::SessionEvent;
pub use frame::{Direction, Frame};
pub use history::FrameHistory;
pub use message::{classify, Classified};
pub use session::{
    MonitorSession, LOST_CONNECTION_NOTICE, QUEUE_FULL_NOTICE, SEND_REJECTED_NOTICE,
};
pub use state::{ActivityLevel, ConnectionState, ServiceIdentity};
