use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use canmon_core::{ActivityLevel, ConnectionState, Frame, MonitorSession, SessionEvent};

/// Shared view of one monitor session.
///
/// Readers get snapshots and change notifications. Mutation goes through
/// [`SessionHandle::apply`], which only the supervising task and the
/// connection manager call, so writes stay on one logical thread.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<RwLock<MonitorSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn new(session: MonitorSession, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            inner: Arc::new(RwLock::new(session)),
            events,
        }
    }

    /// Subscribe to change notifications. Slow subscribers miss events
    /// (`Lagged`) but can always re-read the current state.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> BroadcastStream<SessionEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.read().connection_state().clone()
    }

    pub fn service_url(&self) -> Option<String> {
        self.inner.read().service_url().map(str::to_owned)
    }

    pub fn activity_level(&self) -> ActivityLevel {
        self.inner.read().activity_level()
    }

    pub fn notice(&self) -> Option<String> {
        self.inner.read().notice().map(str::to_owned)
    }

    /// Snapshot of the retained frames, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        self.inner.read().frames().cloned().collect()
    }

    /// Iterate the retained frames in place, oldest first.
    pub fn with_frames<R>(&self, f: impl FnOnce(&mut dyn Iterator<Item = &Frame>) -> R) -> R {
        let session = self.inner.read();
        let mut frames = session.frames();
        f(&mut frames)
    }

    /// Borrow the session for reading without cloning frames.
    pub fn read<R>(&self, f: impl FnOnce(&MonitorSession) -> R) -> R {
        f(&self.inner.read())
    }

    /// Dismiss the current notice.
    pub fn clear_notice(&self) {
        self.apply(|session, events| events.extend(session.clear_notice()));
    }

    /// Mutate the session and publish the events the closure collects.
    /// Events go out after the write lock is released.
    pub(crate) fn apply<R>(
        &self,
        f: impl FnOnce(&mut MonitorSession, &mut Vec<SessionEvent>) -> R,
    ) -> R {
        let mut events = Vec::new();
        let result = {
            let mut session = self.inner.write();
            f(&mut session, &mut events)
        };
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        result
    }
}
