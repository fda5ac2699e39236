//! Transport seam between the connection manager and the wire.
//!
//! A [`Connector`] turns an [`Endpoint`] into a [`Channel`]: a sender for
//! outgoing text frames and a receiver of [`ChannelEvent`]s. The production
//! connector speaks WebSocket through `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::endpoint::Endpoint;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Lifecycle and data notifications from an open channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(String),
    Error(String),
    Closed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("connect to {endpoint} failed: {reason}")]
    Failed { endpoint: String, reason: String },
}

/// Local end of an established channel.
#[derive(Debug)]
pub struct Channel {
    pub(crate) outgoing: mpsc::Sender<String>,
    pub(crate) events: mpsc::Receiver<ChannelEvent>,
}

/// Remote end of a [`Channel`] created with [`Channel::pair`]. Whatever the
/// local side sends shows up on `sent`; events pushed here reach the local side.
#[derive(Debug)]
pub struct ChannelPeer {
    pub sent: mpsc::Receiver<String>,
    pub events: mpsc::Sender<ChannelEvent>,
}

impl Channel {
    pub fn new(outgoing: mpsc::Sender<String>, events: mpsc::Receiver<ChannelEvent>) -> Self {
        Self { outgoing, events }
    }

    /// In-memory channel for transports that are not sockets, and for tests.
    pub fn pair(buffer: usize) -> (Self, ChannelPeer) {
        let (out_tx, out_rx) = mpsc::channel(buffer);
        let (ev_tx, ev_rx) = mpsc::channel(buffer);
        (
            Self::new(out_tx, ev_rx),
            ChannelPeer {
                sent: out_rx,
                events: ev_tx,
            },
        )
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Channel, ConnectError>;
}

/// WebSocket connector.
#[derive(Clone, Debug)]
pub struct WsConnector {
    buffer: usize,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl WsConnector {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Channel, ConnectError> {
        let (ws, _response) =
            connect_async(endpoint.as_str())
                .await
                .map_err(|e| ConnectError::Failed {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        let (out_tx, out_rx) = mpsc::channel(self.buffer);
        let (ev_tx, ev_rx) = mpsc::channel(self.buffer);
        // The pump ends on its own once either side goes away.
        let _pump = tokio::spawn(ws_pump(ws, out_rx, ev_tx));

        Ok(Channel::new(out_tx, ev_rx))
    }
}

/// Moves frames between the socket and the channel halves until one side
/// finishes. Dropping the outgoing sender closes the socket politely.
async fn ws_pump(
    ws: WsStream,
    mut outgoing: mpsc::Receiver<String>,
    events: mpsc::Sender<ChannelEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            out = outgoing.recv() => {
                let Some(text) = out else {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    debug!("channel released, socket closed");
                    break;
                };
                trace!(len = text.len(), "sending frame");
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    let _ = events.send(ChannelEvent::Error(e.to_string())).await;
                    break;
                }
            }
            incoming = ws_rx.next() => {
                let event = match incoming {
                    Some(Ok(Message::Text(text))) => ChannelEvent::Message(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(bytes))) => {
                        debug!(len = bytes.len(), "ignoring binary message");
                        continue;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_owned())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_owned());
                        ChannelEvent::Closed(reason)
                    }
                    // Ping/pong replies are handled by tungstenite.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        ChannelEvent::Error(e.to_string())
                    }
                    None => ChannelEvent::Closed("connection ended".to_owned()),
                };

                let terminal = !matches!(event, ChannelEvent::Message(_));
                if events.send(event).await.is_err() || terminal {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Accepts one WebSocket client and hands it to `serve`.
    async fn one_shot_server<F, Fut>(serve: F) -> (Endpoint, tokio::task::JoinHandle<WsServer>)
    where
        F: FnOnce(WsServer) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = WsServer> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            serve(ws).await
        });
        let endpoint = Endpoint::from_origin(&format!("http://127.0.0.1:{port}")).unwrap();
        (endpoint, server)
    }

    type WsServer = WebSocketStream<TcpStream>;

    #[tokio::test]
    async fn protocol_violation_becomes_error_event() {
        let (endpoint, server) = one_shot_server(|mut ws| async move {
            // Text frame with every reserved bit set.
            ws.get_mut().write_all(&[0xF1, 0x00]).await.unwrap();
            ws
        })
        .await;

        let mut channel = WsConnector::default().connect(&endpoint).await.unwrap();
        assert_matches!(channel.events.recv().await, Some(ChannelEvent::Error(_)));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn binary_skipped_and_close_reason_kept() {
        let (endpoint, server) = one_shot_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xCA, 0xFE].into())).await.unwrap();
            ws.send(Message::Text(r#"{"data":"1#00"}"#.into())).await.unwrap();
            ws.close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                code: tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode::Away,
                reason: "maintenance".into(),
            }))
            .await
            .unwrap();
            ws
        })
        .await;

        let mut channel = WsConnector::default().connect(&endpoint).await.unwrap();
        assert_eq!(
            channel.events.recv().await,
            Some(ChannelEvent::Message(r#"{"data":"1#00"}"#.into()))
        );
        assert_eq!(
            channel.events.recv().await,
            Some(ChannelEvent::Closed("maintenance".into()))
        );
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn pair_routes_both_directions() {
        let (mut channel, mut peer) = Channel::pair(4);

        channel.outgoing.send("1#00".into()).await.unwrap();
        assert_eq!(peer.sent.recv().await.unwrap(), "1#00");

        peer.events
            .send(ChannelEvent::Message("{}".into()))
            .await
            .unwrap();
        assert_eq!(
            channel.events.recv().await.unwrap(),
            ChannelEvent::Message("{}".into())
        );
    }

    #[tokio::test]
    async fn ws_connector_reports_refused_connection() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint::from_origin(&format!("http://127.0.0.1:{port}")).unwrap();
        let err = WsConnector::default().connect(&endpoint).await.unwrap_err();
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}/ws")));
    }
}
