use serde::Serialize;

use crate::frame::Frame;
use crate::state::{ActivityLevel, ConnectionState};

/// Change notification emitted whenever the session read model changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ConnectionChanged { state: ConnectionState },
    Heartbeat { url: String, activity: ActivityLevel },
    FrameRecorded { frame: Frame },
    NoticeChanged { notice: Option<String> },
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionChanged { .. } => "connection_changed",
            Self::Heartbeat { .. } => "heartbeat",
            Self::FrameRecorded { .. } => "frame_recorded",
            Self::NoticeChanged { .. } => "notice_changed",
        }
    }
}
