//! The monitor session: one explicit object holding every piece of state the
//! rendering side reads. Mutators return the change notifications they cause
//! so the owner can publish them.

use tracing::{debug, trace};

use crate::errors::Result;
use crate::events::SessionEvent;
use crate::frame::{Direction, Frame};
use crate::history::FrameHistory;
use crate::message::{classify, Classified};
use crate::state::{ActivityLevel, ConnectionState, ServiceIdentity};

/// Notice raised when the channel errors or closes.
pub const LOST_CONNECTION_NOTICE: &str = "Lost connection to the server";

/// Notice raised when a frame is submitted while the channel is not open.
pub const SEND_REJECTED_NOTICE: &str = "Not connected: frame was not sent";

/// Notice raised when the channel is open but cannot take another frame.
pub const QUEUE_FULL_NOTICE: &str = "Send queue full: frame was not sent";

#[derive(Clone, Debug)]
pub struct MonitorSession {
    connection: ConnectionState,
    identity: Option<ServiceIdentity>,
    activity: ActivityLevel,
    notice: Option<String>,
    history: FrameHistory,
    next_sequence: u64,
}

impl MonitorSession {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            connection: ConnectionState::Connecting,
            identity: None,
            activity: ActivityLevel::default(),
            notice: None,
            history: FrameHistory::new(capacity)?,
            next_sequence: 0,
        })
    }

    pub fn with_activity(mut self, activity: ActivityLevel) -> Self {
        self.activity = activity;
        self
    }

    // ── Read model ──────────────────────────────────────────────────

    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn service_identity(&self) -> Option<&ServiceIdentity> {
        self.identity.as_ref()
    }

    pub fn service_url(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.url.as_str())
    }

    pub fn activity_level(&self) -> ActivityLevel {
        self.activity
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    /// Retained frames, oldest first.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = &Frame> + ExactSizeIterator + '_ {
        self.history.iter()
    }

    /// Sequence number the next recorded frame will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Decode and apply one raw inbound message.
    ///
    /// A malformed message is rejected before any effect is applied, so it
    /// never consumes a sequence number.
    pub fn apply_inbound(&mut self, raw: &str) -> Result<Vec<SessionEvent>> {
        let effects = classify(raw)?;
        Ok(self.apply(effects))
    }

    /// Apply already-classified effects in order.
    pub fn apply(&mut self, effects: Vec<Classified>) -> Vec<SessionEvent> {
        let mut events = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Classified::Heartbeat(identity) => {
                    let activity = self.activity.advance();
                    trace!(url = %identity.url, activity = activity.value(), "heartbeat");
                    events.push(SessionEvent::Heartbeat {
                        url: identity.url.clone(),
                        activity,
                    });
                    self.identity = Some(identity);
                }
                Classified::Frame(payload) => {
                    let frame = self.record(payload, Direction::Inbound);
                    events.push(SessionEvent::FrameRecorded { frame });
                }
                Classified::Notice(text) => {
                    events.push(self.raise_notice(text));
                }
            }
        }
        events
    }

    // ── Outbound ────────────────────────────────────────────────────

    /// Record a locally submitted frame for display.
    pub fn record_outgoing(&mut self, payload: impl Into<String>) -> Frame {
        self.record(payload.into(), Direction::Outbound)
    }

    fn record(&mut self, payload: String, direction: Direction) -> Frame {
        let frame = Frame::new(self.next_sequence, payload, direction);
        self.next_sequence += 1;
        trace!(id = frame.id(), direction = direction.as_str(), "frame recorded");
        if let Some(evicted) = self.history.append(frame.clone()) {
            trace!(sequence = evicted.sequence(), "evicted frame");
        }
        frame
    }

    // ── Connection and notices ──────────────────────────────────────

    /// Set the connection state. Returns `None` if it did not change.
    pub fn set_connection(&mut self, state: ConnectionState) -> Option<SessionEvent> {
        if self.connection == state {
            return None;
        }
        debug!(from = self.connection.name(), to = state.name(), "connection state changed");
        self.connection = state.clone();
        Some(SessionEvent::ConnectionChanged { state })
    }

    /// Error and close are handled identically: `Closed(reason)` plus the
    /// lost-connection notice.
    pub fn connection_lost(&mut self, reason: impl Into<String>) -> Vec<SessionEvent> {
        let mut events = Vec::with_capacity(2);
        events.extend(self.set_connection(ConnectionState::Closed(reason.into())));
        events.push(self.raise_notice(LOST_CONNECTION_NOTICE));
        events
    }

    pub fn reject_send(&mut self) -> SessionEvent {
        self.raise_notice(SEND_REJECTED_NOTICE)
    }

    pub fn reject_full_queue(&mut self) -> SessionEvent {
        self.raise_notice(QUEUE_FULL_NOTICE)
    }

    pub fn raise_notice(&mut self, text: impl Into<String>) -> SessionEvent {
        let text = text.into();
        self.notice = Some(text.clone());
        SessionEvent::NoticeChanged { notice: Some(text) }
    }

    /// Clearing is the renderer's job; the core never clears on its own.
    pub fn clear_notice(&mut self) -> Option<SessionEvent> {
        self.notice
            .take()
            .map(|_| SessionEvent::NoticeChanged { notice: None })
    }
}
