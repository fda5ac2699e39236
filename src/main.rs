//! # canmon
//!
//! Headless monitor: streams CAN frames from the telemetry backend, prints
//! them as they arrive and submits frames typed on stdin, one per line.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use canmon_client::{Monitor, MonitorConfig, SessionHandle};
use canmon_core::SessionEvent;
use canmon_settings::MonitorSettings;
use canmon_telemetry::{init_telemetry, TelemetryConfig};

/// CAN telemetry monitor.
#[derive(Parser, Debug)]
#[command(name = "canmon", about = "Stream and send CAN frames over the telemetry channel")]
struct Cli {
    /// Origin of the telemetry backend, e.g. http://127.0.0.1:3000.
    #[arg(long)]
    origin: Option<String>,

    /// Frames kept in the history window.
    #[arg(long)]
    capacity: Option<usize>,

    /// Settings file (defaults to ~/.canmon/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Give up after the first disconnect.
    #[arg(long)]
    no_reconnect: bool,
}

impl Cli {
    fn load_settings(&self) -> Result<MonitorSettings> {
        let mut settings = match &self.settings {
            Some(path) => canmon_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => canmon_settings::load_settings().context("Failed to load settings")?,
        };

        if let Some(origin) = &self.origin {
            settings.origin.clone_from(origin);
        }
        if let Some(capacity) = self.capacity {
            settings.history_capacity = capacity;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
        if self.no_reconnect {
            settings.reconnect.enabled = false;
        }

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let telemetry = init_telemetry(TelemetryConfig::from_level_name(
        &settings.logging.level,
        settings.logging.json,
    ));
    debug!(filter = telemetry.directive(), "telemetry initialized");

    let config = MonitorConfig::from_settings(&settings).context("Invalid monitor configuration")?;
    info!(
        endpoint = %config.endpoint,
        secure = config.endpoint.is_secure(),
        capacity = config.history_capacity,
        reconnect = config.reconnect.enabled,
        "starting monitor"
    );

    let handle = Monitor::websocket(config).spawn()?;
    let renderer = tokio::spawn(render(handle.session().clone()));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                let frame = line.trim();
                if frame.is_empty() {
                    continue;
                }
                match handle.submit(frame).await {
                    Ok(sent) => debug!(id = sent.id(), "frame submitted"),
                    // The renderer already shows the matching notice.
                    Err(e) if e.is_user_visible() => debug!(kind = e.error_kind(), "frame not sent"),
                    Err(e) => warn!(error = %e, kind = e.error_kind(), "frame not sent"),
                }
            }
        }
    }

    let state = handle.shutdown().await;
    renderer.abort();
    info!(state = %state, "monitor stopped");
    Ok(())
}

/// Print frames on stdout and report connection and notice changes.
async fn render(session: SessionHandle) {
    let mut events = session.events();
    while let Some(event) = events.next().await {
        match event {
            Ok(SessionEvent::FrameRecorded { frame }) => println!("{frame}"),
            Ok(SessionEvent::ConnectionChanged { state }) => info!(state = %state, "connection"),
            Ok(SessionEvent::Heartbeat { url, activity }) => {
                debug!(url = %url, activity = activity.value(), "heartbeat");
            }
            Ok(SessionEvent::NoticeChanged { notice: Some(text) }) => warn!("{text}"),
            Ok(SessionEvent::NoticeChanged { notice: None }) => {}
            Err(e) => warn!(error = %e, "renderer fell behind"),
        }
    }
}
