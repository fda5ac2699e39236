//! In-process telemetry backend for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use canmon_client::{Endpoint, MonitorConfig};
use canmon_settings::ReconnectSettings;

pub const SERVICE_URL: &str = "http://vehicle-gateway.local";

/// One step the backend plays to every new connection.
#[derive(Clone, Debug)]
pub enum Step {
    /// Heartbeat plus data, in the backend's own field names.
    Frame(String),
    Binary(Vec<u8>),
    /// Close the socket with this reason and stop.
    Close(String),
}

#[derive(Clone)]
struct BackendState {
    script: Arc<Vec<Step>>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    kick: broadcast::Sender<()>,
}

/// Serves `/ws`. Every connection gets the scripted steps, then echoes
/// client text back as a notice.
pub struct TestBackend {
    pub addr: SocketAddr,
    state: BackendState,
    _server: JoinHandle<()>,
}

impl TestBackend {
    pub async fn start(frames: &[&str]) -> Self {
        Self::scripted(frames.iter().map(|f| Step::Frame(f.to_string())).collect()).await
    }

    pub async fn scripted(script: Vec<Step>) -> Self {
        let (kick, _) = broadcast::channel(4);
        let state = BackendState {
            script: Arc::new(script),
            connections: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
            kick,
        };

        let router = Router::new()
            .route("/ws", get(ws_handler))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            addr,
            state,
            _server: server,
        }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().clone()
    }

    /// Close every open socket from the server side.
    pub fn drop_clients(&self) {
        let _ = self.state.kick.send(());
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<BackendState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: BackendState) {
    let mut kick = state.kick.subscribe();
    let _ = state.connections.fetch_add(1, Ordering::SeqCst);

    for (counter, step) in state.script.iter().enumerate() {
        let msg = match step {
            Step::Frame(body) => {
                let msg = json!({ "service_url": SERVICE_URL, "counter": counter, "body": body });
                Message::Text(msg.to_string().into())
            }
            Step::Binary(bytes) => Message::Binary(bytes.clone().into()),
            Step::Close(reason) => {
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: reason.as_str().into(),
                    })))
                    .await;
                return;
            }
        };
        if socket.send(msg).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = kick.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    state.received.lock().push(text.to_string());
                    let reply = json!({ "notice": format!("echo: {}", text.as_str()) });
                    if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    }
}

pub fn config(origin: &str, capacity: usize) -> MonitorConfig {
    MonitorConfig {
        reconnect: ReconnectSettings {
            enabled: true,
            base_delay_ms: 20,
            max_delay_ms: 200,
            jitter_factor: 0.0,
            max_attempts: None,
        },
        ..MonitorConfig::new(Endpoint::from_origin(origin).unwrap(), capacity)
    }
}

/// Poll until `condition` holds or five seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 5s");
}
