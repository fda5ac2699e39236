use serde::{Deserialize, Serialize};

/// Lifecycle of the streaming channel. Exactly one value is current.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed(String),
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed(_) => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed(reason) => write!(f, "closed ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Last-known address of the backend, replaced on every heartbeat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub url: String,
}

impl ServiceIdentity {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Liveness pulse in `[0, 100)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLevel(u8);

impl ActivityLevel {
    pub const STEP: u8 = 4;
    pub const MODULUS: u8 = 100;

    /// Construct from any value; it is reduced modulo 100.
    pub fn new(level: u8) -> Self {
        Self(level % Self::MODULUS)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Advance by one heartbeat step, wrapping at 100.
    pub fn advance(&mut self) -> Self {
        self.0 = (self.0 + Self::STEP) % Self::MODULUS;
        *self
    }
}
