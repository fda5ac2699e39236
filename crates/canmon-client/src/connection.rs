use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use canmon_core::{ConnectionState, MonitorError};

use crate::endpoint::Endpoint;
use crate::handle::SessionHandle;
use crate::transport::{ChannelEvent, Connector};

/// Why [`ConnectionManager::send`] did not forward a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("channel is not open")]
    NotOpen,
    #[error("outgoing queue is full")]
    QueueFull,
}

/// Owns exactly one channel attempt and is the only thing that touches the
/// transport. It never retries; the supervisor builds a new one instead.
#[derive(Debug)]
pub struct ConnectionManager {
    endpoint: Endpoint,
    session: SessionHandle,
    state: ConnectionState,
    outgoing: Option<mpsc::Sender<String>>,
    events: Option<mpsc::Receiver<ChannelEvent>>,
}

impl ConnectionManager {
    /// Attempt the channel: `Connecting`, then `Open` or `Closed(reason)`.
    pub async fn open(
        connector: &dyn Connector,
        endpoint: Endpoint,
        session: SessionHandle,
    ) -> Self {
        session.apply(|s, ev| ev.extend(s.set_connection(ConnectionState::Connecting)));
        debug!(endpoint = %endpoint, "opening channel");

        match connector.connect(&endpoint).await {
            Ok(channel) => {
                info!(endpoint = %endpoint, "channel open");
                session.apply(|s, ev| ev.extend(s.set_connection(ConnectionState::Open)));
                Self {
                    endpoint,
                    session,
                    state: ConnectionState::Open,
                    outgoing: Some(channel.outgoing),
                    events: Some(channel.events),
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(endpoint = %endpoint, error = %reason, "channel attempt failed");
                session.apply(|s, ev| ev.extend(s.connection_lost(reason.clone())));
                Self {
                    endpoint,
                    session,
                    state: ConnectionState::Closed(reason),
                    outgoing: None,
                    events: None,
                }
            }
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Forward a raw frame. Outside `Open`, or when the transport cannot
    /// take it, the frame is dropped and the reason returned.
    pub fn send(&self, payload: &str) -> Result<(), SendError> {
        let Some(outgoing) = self.outgoing.as_ref().filter(|_| self.state.is_open()) else {
            debug!(state = self.state.name(), "dropping send on non-open channel");
            return Err(SendError::NotOpen);
        };
        match outgoing.try_send(payload.to_owned()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(len = payload.len(), "outgoing queue full, dropping frame");
                Err(SendError::QueueFull)
            }
            // Transport task is gone; the close event follows.
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::NotOpen),
        }
    }

    /// Next transport notification. Cancel-safe. Returns `None` once the
    /// channel is gone; a transport that vanishes without a close event is
    /// reported as closed once.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        let events = self.events.as_mut()?;
        match events.recv().await {
            Some(event) => Some(event),
            None => Some(ChannelEvent::Closed("transport ended".to_owned())),
        }
    }

    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(raw) => self.on_message(&raw),
            ChannelEvent::Error(reason) => self.on_error(&reason),
            ChannelEvent::Closed(reason) => self.on_close(&reason),
        }
    }

    /// Classify and apply one inbound message. Malformed ones are dropped.
    pub fn on_message(&mut self, raw: &str) {
        if !self.state.is_open() {
            debug!("ignoring message on non-open channel");
            return;
        }
        let result = self.session.apply(|s, ev| {
            let events = s.apply_inbound(raw)?;
            ev.extend(events);
            Ok::<_, MonitorError>(())
        });
        if let Err(e) = result {
            debug!(
                error = %e,
                kind = e.error_kind(),
                len = raw.len(),
                "dropping malformed message"
            );
        }
    }

    pub fn on_error(&mut self, reason: &str) {
        warn!(endpoint = %self.endpoint, reason, "channel error");
        self.lost(reason);
    }

    pub fn on_close(&mut self, reason: &str) {
        info!(endpoint = %self.endpoint, reason, "channel closed");
        self.lost(reason);
    }

    /// Drive the channel until it closes. Returns the final state.
    pub async fn run(&mut self) -> ConnectionState {
        while let Some(event) = self.next_event().await {
            self.handle_event(event);
            if !self.is_open() {
                break;
            }
        }
        self.state.clone()
    }

    /// Local teardown. Releases the channel without the lost-connection notice.
    pub fn close(&mut self, reason: &str) {
        if self.state.is_closed() {
            return;
        }
        self.release(reason);
        self.session
            .apply(|s, ev| ev.extend(s.set_connection(ConnectionState::Closed(reason.to_owned()))));
    }

    fn lost(&mut self, reason: &str) {
        if self.state.is_closed() {
            return;
        }
        self.release(reason);
        self.session
            .apply(|s, ev| ev.extend(s.connection_lost(reason.to_owned())));
    }

    fn release(&mut self, reason: &str) {
        self.state = ConnectionState::Closed(reason.to_owned());
        self.outgoing = None;
        self.events = None;
    }
}
