//! Supervised monitor: reconnect loop around [`ConnectionManager`].
//!
//! One task owns the connection and processes transport events and
//! submissions in arrival order. Between attempts the session shows
//! `Connecting` while the backoff delay runs.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use canmon_core::{ConnectionState, Frame, MonitorError, MonitorSession, Result};
use canmon_settings::{MonitorSettings, ReconnectSettings};

use crate::backoff::Backoff;
use crate::connection::ConnectionManager;
use crate::endpoint::Endpoint;
use crate::handle::SessionHandle;
use crate::submit::submit_frame;
use crate::transport::{Connector, WsConnector};

const SHUTDOWN_REASON: &str = "shutdown";

/// Runtime configuration for a [`Monitor`].
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub endpoint: Endpoint,
    pub history_capacity: usize,
    pub reconnect: ReconnectSettings,
    pub command_queue: usize,
    pub event_buffer: usize,
}

impl MonitorConfig {
    pub fn new(endpoint: Endpoint, history_capacity: usize) -> Self {
        let defaults = MonitorSettings::default();
        Self {
            endpoint,
            history_capacity,
            reconnect: defaults.reconnect,
            command_queue: defaults.command_queue,
            event_buffer: defaults.event_buffer,
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::from_origin(&settings.origin)?,
            history_capacity: settings.history_capacity,
            reconnect: settings.reconnect.clone(),
            command_queue: settings.command_queue,
            event_buffer: settings.event_buffer,
        })
    }
}

enum Command {
    Submit {
        frame: String,
        reply: oneshot::Sender<Result<Frame>>,
    },
}

pub struct Monitor {
    config: MonitorConfig,
    connector: Arc<dyn Connector>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    /// Monitor over a real WebSocket.
    pub fn websocket(config: MonitorConfig) -> Self {
        Self::new(config, Arc::new(WsConnector::default()))
    }

    /// Start the supervising task. Must be called inside a Tokio runtime.
    pub fn spawn(self) -> Result<MonitorHandle> {
        let session = SessionHandle::new(
            MonitorSession::new(self.config.history_capacity)?,
            self.config.event_buffer,
        );
        let (commands_tx, commands_rx) = mpsc::channel(self.config.command_queue.max(1));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(supervise(
            self.config,
            self.connector,
            session.clone(),
            commands_rx,
            cancel.clone(),
        ));

        Ok(MonitorHandle {
            session,
            commands: commands_tx,
            cancel,
            task: Some(task),
        })
    }
}

/// Handle to a running monitor. Dropping it stops the monitor.
pub struct MonitorHandle {
    session: SessionHandle,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: Option<JoinHandle<ConnectionState>>,
}

impl MonitorHandle {
    /// Read model and change notifications.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Submit a frame for sending. Resolves once the supervising task has
    /// sent and recorded it, or rejected it.
    pub async fn submit(&self, frame: impl Into<String>) -> Result<Frame> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                frame: frame.into(),
                reply,
            })
            .await
            .map_err(|_| MonitorError::MonitorStopped)?;
        rx.await.map_err(|_| MonitorError::MonitorStopped)?
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the monitor and wait for it. Returns the final connection state.
    pub async fn shutdown(mut self) -> ConnectionState {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!(error = %e, "monitor task failed");
                ConnectionState::Closed(format!("monitor task failed: {e}"))
            }),
            None => self.session.connection_state(),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("state", &self.session.connection_state())
            .field("finished", &self.is_finished())
            .finish()
    }
}

async fn supervise(
    config: MonitorConfig,
    connector: Arc<dyn Connector>,
    session: SessionHandle,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) -> ConnectionState {
    let mut backoff = Backoff::from_settings(&config.reconnect);
    let mut consecutive_failures: u32 = 0;

    loop {
        // Connecting: submissions are rejected until the attempt resolves.
        let open = ConnectionManager::open(
            connector.as_ref(),
            config.endpoint.clone(),
            session.clone(),
        );
        tokio::pin!(open);
        let mut conn = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return finish(&session),
                conn = &mut open => break conn,
                Some(cmd) = commands.recv() => handle_command(None, &session, cmd),
            }
        };

        if conn.is_open() {
            consecutive_failures = 0;
            backoff.reset();
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        conn.close(SHUTDOWN_REASON);
                        return finish(&session);
                    }
                    event = conn.next_event() => {
                        let Some(event) = event else { break };
                        conn.handle_event(event);
                        if !conn.is_open() {
                            break;
                        }
                    }
                    Some(cmd) = commands.recv() => handle_command(Some(&conn), &session, cmd),
                }
            }
        } else {
            consecutive_failures = consecutive_failures.saturating_add(1);
        }

        let exhausted = config
            .reconnect
            .max_attempts
            .is_some_and(|max| consecutive_failures >= max);
        if !config.reconnect.enabled || exhausted {
            let state = conn.state().clone();
            info!(
                endpoint = %conn.endpoint(),
                state = %state,
                failures = consecutive_failures,
                "monitor not reconnecting"
            );
            return stranded(&session, &mut commands, &cancel, state).await;
        }

        let delay = backoff.next_delay();
        info!(
            endpoint = %config.endpoint,
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "reconnecting after backoff"
        );
        session.apply(|s, ev| ev.extend(s.set_connection(ConnectionState::Connecting)));
        drop(conn);

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return finish(&session),
                () = &mut sleep => break,
                Some(cmd) = commands.recv() => handle_command(None, &session, cmd),
            }
        }
    }
}

/// No more attempts: keep answering submissions (with rejections) until
/// the monitor is shut down.
async fn stranded(
    session: &SessionHandle,
    commands: &mut mpsc::Receiver<Command>,
    cancel: &CancellationToken,
    state: ConnectionState,
) -> ConnectionState {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return state,
            cmd = commands.recv() => match cmd {
                Some(cmd) => handle_command(None, session, cmd),
                None => return state,
            },
        }
    }
}

fn handle_command(conn: Option<&ConnectionManager>, session: &SessionHandle, cmd: Command) {
    match cmd {
        Command::Submit { frame, reply } => {
            let result = submit_frame(conn, session, &frame);
            let _ = reply.send(result);
        }
    }
}

fn finish(session: &SessionHandle) -> ConnectionState {
    info!("monitor shut down");
    let state = ConnectionState::Closed(SHUTDOWN_REASON.to_owned());
    session.apply(|s, ev| ev.extend(s.set_connection(state.clone())));
    state
}
