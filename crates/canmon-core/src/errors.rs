/// Errors raised by the monitor core and its client.
///
/// None of these are fatal to the hosting process. Transport failures and
/// rejected sends are also reflected in the session as a notice.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("channel is not open")]
    SendWhileClosed,

    #[error("outgoing queue is full")]
    SendQueueFull,

    #[error("frame is empty")]
    EmptyFrame,

    #[error("invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("history capacity must be at least 1")]
    InvalidCapacity,

    #[error("monitor has stopped")]
    MonitorStopped,
}

impl MonitorError {
    /// Whether the user should see this error as a notice.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure(_) | Self::SendWhileClosed | Self::SendQueueFull
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::TransportFailure(_) => "transport_failure",
            Self::MalformedMessage(_) => "malformed_message",
            Self::SendWhileClosed => "send_while_closed",
            Self::SendQueueFull => "send_queue_full",
            Self::EmptyFrame => "empty_frame",
            Self::InvalidOrigin(_) => "invalid_origin",
            Self::InvalidCapacity => "invalid_capacity",
            Self::MonitorStopped => "monitor_stopped",
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        MonitorError::MalformedMessage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
