use tracing::{debug, info};

use canmon_core::{Frame, MonitorError, Result};

use crate::connection::{ConnectionManager, SendError};
use crate::handle::SessionHandle;

/// Send a user-composed frame and echo it into the history.
///
/// The text (conventionally `identifier#payload`) is passed through
/// untouched. With no open connection the frame is rejected and the
/// rejected-send notice is raised. An open channel whose outgoing queue is
/// full rejects with [`MonitorError::SendQueueFull`] and its own notice.
/// Nothing is recorded in either case.
pub fn submit_frame(
    connection: Option<&ConnectionManager>,
    session: &SessionHandle,
    frame: &str,
) -> Result<Frame> {
    if frame.trim().is_empty() {
        return Err(MonitorError::EmptyFrame);
    }

    let sent = match connection {
        Some(conn) => conn.send(frame),
        None => Err(SendError::NotOpen),
    };
    if let Err(reason) = sent {
        let err = match reason {
            SendError::NotOpen => MonitorError::SendWhileClosed,
            SendError::QueueFull => MonitorError::SendQueueFull,
        };
        info!(kind = err.error_kind(), len = frame.len(), "rejecting frame");
        session.apply(|s, ev| {
            ev.push(match reason {
                SendError::NotOpen => s.reject_send(),
                SendError::QueueFull => s.reject_full_queue(),
            })
        });
        return Err(err);
    }

    let recorded = session.apply(|s, ev| {
        let recorded = s.record_outgoing(frame);
        ev.push(canmon_core::SessionEvent::FrameRecorded {
            frame: recorded.clone(),
        });
        recorded
    });
    debug!(id = recorded.id(), "frame submitted");
    Ok(recorded)
}
