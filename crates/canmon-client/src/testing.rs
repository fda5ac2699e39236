//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use canmon_core::MonitorSession;

use crate::endpoint::Endpoint;
use crate::handle::SessionHandle;
use crate::transport::{Channel, ChannelPeer, ConnectError, Connector};

/// Hands out pre-built outcomes in order; fails once they run out.
pub(crate) struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Result<Channel, ConnectError>>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub(crate) fn new(outcomes: Vec<Result<Channel, ConnectError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_channels(count: usize) -> (Self, Vec<ChannelPeer>) {
        let (channels, peers): (Vec<_>, Vec<_>) = (0..count).map(|_| Channel::pair(16)).unzip();
        (Self::new(channels.into_iter().map(Ok).collect()), peers)
    }

    pub(crate) fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

pub(crate) fn refused() -> ConnectError {
    ConnectError::Failed {
        endpoint: "ws://test/ws".into(),
        reason: "connection refused".into(),
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> Result<Channel, ConnectError> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.outcomes.lock().pop_front().unwrap_or_else(|| Err(refused()))
    }
}

pub(crate) fn endpoint() -> Endpoint {
    Endpoint::from_origin("http://test").unwrap()
}

pub(crate) fn session_handle(capacity: usize) -> SessionHandle {
    SessionHandle::new(MonitorSession::new(capacity).unwrap(), 64)
}
