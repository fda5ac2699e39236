use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{Result, SettingsError};

/// Top-level monitor settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    /// Origin of the page serving the UI; the channel endpoint is derived from it.
    pub origin: String,
    /// Number of frames kept in the history window.
    pub history_capacity: usize,
    pub reconnect: ReconnectSettings,
    /// Pending submissions accepted before `submit` waits.
    pub command_queue: usize,
    /// Change notifications buffered per subscriber.
    pub event_buffer: usize,
    pub logging: LoggingSettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:3000".to_string(),
            history_capacity: 100,
            reconnect: ReconnectSettings::default(),
            command_queue: 64,
            event_buffer: 256,
            logging: LoggingSettings::default(),
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "historyCapacity must be at least 1".into(),
            ));
        }
        if self.command_queue == 0 || self.event_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "commandQueue and eventBuffer must be at least 1".into(),
            ));
        }
        let origin = Url::parse(&self.origin)
            .map_err(|e| SettingsError::InvalidValue(format!("origin {:?}: {e}", self.origin)))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidValue(format!(
                "origin scheme must be http or https, got {}",
                origin.scheme()
            )));
        }
        self.reconnect.validate()
    }
}

/// Supervisor reconnect policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectSettings {
    pub enabled: bool,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
    /// Consecutive failed attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
            max_attempts: None,
        }
    }
}

impl ReconnectSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_delay_ms > self.max_delay_ms {
            return Err(SettingsError::InvalidValue(format!(
                "reconnect.baseDelayMs ({}) exceeds reconnect.maxDelayMs ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(SettingsError::InvalidValue(format!(
                "reconnect.jitterFactor must be within 0..=1, got {}",
                self.jitter_factor
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
