use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the channel a frame came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from the backend.
    Inbound,
    /// Submitted locally and sent to the backend.
    Outbound,
}

impl Direction {
    pub fn is_local(self) -> bool {
        self == Self::Outbound
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// One recorded CAN frame. The payload is opaque to the monitor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    sequence: u64,
    id: String,
    payload: String,
    direction: Direction,
    recorded_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(sequence: u64, payload: impl Into<String>, direction: Direction) -> Self {
        Self {
            sequence,
            id: format_frame_id(sequence),
            payload: payload.into(),
            direction,
            recorded_at: Utc::now(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Zero-padded hex rendering of the sequence number. Eight characters up
    /// to `u32::MAX`, wider after that.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arrow = match self.direction {
            Direction::Inbound => "<-",
            Direction::Outbound => "->",
        };
        write!(f, "{} {} {}", self.id, arrow, self.payload)
    }
}

/// Render a sequence number as at least 8 uppercase hex digits.
pub fn format_frame_id(sequence: u64) -> String {
    format!("{sequence:08X}")
}
