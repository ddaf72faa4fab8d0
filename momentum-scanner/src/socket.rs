/// Push channel client for the backend Socket.IO server
///
/// Provides automatic reconnection, Engine.IO heartbeat replies, and event decoding
use crate::error::ClientError;
use futures::{SinkExt, StreamExt};
use momentum_core::{
    Frame, PushEvent,
    channel::{ENGINE_IO_QUERY, SOCKET_IO_PATH},
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

/// Push channel configuration
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Server URL; the Socket.IO path and query are appended
    pub url: String,
    /// Optional auth token passed as a query parameter
    pub token: Option<String>,
    /// Broker account id; position events for other accounts are dropped
    pub account_id: Option<String>,
    /// Reconnection delay after disconnect
    pub reconnect_delay: Duration,
    /// Maximum channel buffer size for events
    pub channel_buffer_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000".to_string(),
            token: None,
            account_id: None,
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 10_000,
        }
    }
}

impl PushConfig {
    /// Create a new configuration with custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set auth token
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Set broker account id
    pub fn with_account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

/// Build the Engine.IO WebSocket URL, eg/ `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(base: &str, token: Option<&str>) -> Result<Url, ClientError> {
    let mut url = Url::parse(base)?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(ClientError::Config(format!("unsupported push scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::Config(format!("cannot use scheme {scheme} for {base}")))?;

    let path = format!("{}{}", url.path().trim_end_matches('/'), SOCKET_IO_PATH);
    url.set_path(&path);
    url.set_query(Some(ENGINE_IO_QUERY));
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }

    Ok(url)
}

/// Item delivered to the single store writer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A new session started; state from the previous session must be dropped
    Reset,
    Push(PushEvent),
}

/// Connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// Push channel client
#[derive(Debug)]
pub struct PushClient {
    config: PushConfig,
    event_tx: mpsc::Sender<ChannelEvent>,
    event_rx: mpsc::Receiver<ChannelEvent>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    status_rx: mpsc::Receiver<ConnectionStatus>,
}

impl PushClient {
    /// Create a new push client with custom configuration
    pub fn with_config(config: PushConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer_size);
        let (status_tx, status_rx) = mpsc::channel(10);

        Self {
            config,
            event_tx,
            event_rx,
            status_tx,
            status_rx,
        }
    }

    /// Start the push channel connection
    ///
    /// Returns a receiver for decoded events and a receiver for connection status updates
    pub fn start(self) -> Result<(mpsc::Receiver<ChannelEvent>, mpsc::Receiver<ConnectionStatus>), ClientError> {
        let url = socket_url(&self.config.url, self.config.token.as_deref())?;
        let account_id = self.config.account_id.clone();
        let reconnect_delay = self.config.reconnect_delay;
        let event_tx = self.event_tx.clone();
        let status_tx = self.status_tx.clone();

        tokio::spawn(async move {
            run_socket_loop(url, account_id, reconnect_delay, event_tx, status_tx).await;
        });

        Ok((self.event_rx, self.status_rx))
    }
}

/// What the read loop does with one decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    /// Send a frame back to the server
    Reply(Frame),
    /// Namespace joined
    Joined,
    Deliver(PushEvent),
    /// Session ended by the server
    Close,
    Ignore,
}

/// Map one text frame onto the action the read loop takes.
///
/// Undecodable frames and events are logged and ignored, never fatal. Position events for an
/// account other than `account_id` are ignored.
pub fn handle_text(text: &str, account_id: Option<&str>) -> FrameAction {
    let frame = match Frame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Dropping push frame: {}", e);
            return FrameAction::Ignore;
        }
    };

    match frame {
        Frame::Open(handshake) => {
            debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine.IO open");
            FrameAction::Reply(Frame::Connect)
        }
        Frame::Ping => FrameAction::Reply(Frame::Pong),
        Frame::Connect => FrameAction::Joined,
        Frame::Event { name, payload } => match PushEvent::decode(&name, payload) {
            Ok(event) if event.is_for_account(account_id) => FrameAction::Deliver(event),
            Ok(_) => {
                debug!("Dropping {} for another account", name);
                FrameAction::Ignore
            }
            Err(e) if e.is_malformed() => {
                warn!("Dropping malformed {} event: {}", name, e);
                FrameAction::Ignore
            }
            Err(e) => {
                debug!("{}", e);
                FrameAction::Ignore
            }
        },
        Frame::ConnectError(message) => {
            error!("Namespace connect rejected: {}", message);
            FrameAction::Close
        }
        Frame::Close | Frame::Disconnect => FrameAction::Close,
        Frame::Pong | Frame::Noop | Frame::Ack => FrameAction::Ignore,
    }
}

/// Main push channel loop with auto-reconnect
async fn run_socket_loop(
    url: Url,
    account_id: Option<String>,
    reconnect_delay: Duration,
    event_tx: mpsc::Sender<ChannelEvent>,
    status_tx: mpsc::Sender<ConnectionStatus>,
) {
    info!("Starting push client for {}", url);

    loop {
        // Notify about reconnection attempt
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(url.as_str()).await {
            Ok((mut ws_stream, _)) => {
                info!("Connected to push server at {}", url);

                let mut receiver_dropped = false;
                while let Some(msg) = ws_stream.next().await {
                    match msg {
                        Ok(Message::Text(text)) => match handle_text(text.as_str(), account_id.as_deref()) {
                            FrameAction::Reply(frame) => {
                                if let Err(e) = ws_stream.send(Message::Text(frame.encode().into())).await {
                                    error!("Failed to reply to push server: {}", e);
                                    break;
                                }
                            }
                            FrameAction::Joined => {
                                let _ = status_tx.send(ConnectionStatus::Connected).await;
                                if event_tx.send(ChannelEvent::Reset).await.is_err() {
                                    receiver_dropped = true;
                                    break;
                                }
                            }
                            FrameAction::Deliver(event) => {
                                if event_tx.send(ChannelEvent::Push(event)).await.is_err() {
                                    receiver_dropped = true;
                                    break;
                                }
                            }
                            FrameAction::Close => {
                                info!("Push server closed the session");
                                break;
                            }
                            FrameAction::Ignore => {}
                        },
                        Ok(Message::Close(_)) => {
                            info!("Server closed connection");
                            break;
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                            // Transport heartbeat, tungstenite handles these automatically
                        }
                        Err(e) => {
                            error!("Push channel error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }

                // Notify disconnection
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;

                if receiver_dropped {
                    warn!("Event receiver dropped, stopping push client");
                    return;
                }
                warn!("Connection closed, will reconnect...");
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", url, e);
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        // Wait before reconnecting
        debug!("Waiting {:?} before reconnecting...", reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PushConfig::new("ws://localhost:8080")
            .with_token(Some("abc".to_string()))
            .with_account_id(Some("7".to_string()))
            .with_reconnect_delay(Duration::from_secs(5))
            .with_channel_buffer_size(500);

        assert_eq!(config.url, "ws://localhost:8080");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.account_id.as_deref(), Some("7"));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.channel_buffer_size, 500);
    }

    #[test]
    fn test_default_config() {
        let config = PushConfig::default();
        assert_eq!(config.url, "ws://127.0.0.1:5000");
        assert_eq!(config.token, None);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.channel_buffer_size, 10_000);
    }

    #[test]
    fn test_socket_url() {
        let url = socket_url("ws://127.0.0.1:5000", None).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:5000/socket.io/?EIO=4&transport=websocket");

        let url = socket_url("https://scanner.example/", Some("t k")).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://scanner.example/socket.io/?EIO=4&transport=websocket&token=t+k"
        );

        assert!(matches!(
            socket_url("ftp://scanner.example", None),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(socket_url("not a url", None), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_handle_text() {
        struct TestCase {
            input: &'static str,
            expected: FrameAction,
        }

        let tests = vec![
            TestCase {
                // TC0: open is answered with a namespace connect
                input: r#"0{"sid":"s","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#,
                expected: FrameAction::Reply(Frame::Connect),
            },
            TestCase {
                // TC1: server ping is answered with pong
                input: "2",
                expected: FrameAction::Reply(Frame::Pong),
            },
            TestCase {
                // TC2: namespace joined
                input: r#"40{"sid":"n"}"#,
                expected: FrameAction::Joined,
            },
            TestCase {
                // TC3: decoded event
                input: r#"42["unsubscribe",{"ticker":"AAA"}]"#,
                expected: FrameAction::Deliver(PushEvent::Unsubscribe {
                    ticker: "AAA".to_string(),
                }),
            },
            TestCase {
                // TC4: event without ticker is dropped
                input: r#"42["stock_price",{"price":1.0}]"#,
                expected: FrameAction::Ignore,
            },
            TestCase {
                // TC5: unknown event is dropped
                input: r#"42["cash_orders_1",{}]"#,
                expected: FrameAction::Ignore,
            },
            TestCase {
                // TC6: garbage is dropped
                input: "zzz",
                expected: FrameAction::Ignore,
            },
            TestCase {
                // TC7: server disconnect ends the session
                input: "41",
                expected: FrameAction::Close,
            },
            TestCase {
                // TC8: own account positions are delivered
                input: r#"42["cash_positions_1",{"AAA":{"qty":10}}]"#,
                expected: FrameAction::Deliver(
                    PushEvent::decode("cash_positions_1", serde_json::json!({"AAA": {"qty": 10}})).unwrap(),
                ),
            },
            TestCase {
                // TC9: another account's positions are dropped
                input: r#"42["cash_positions_999",{"ZZZ":{"qty":5}}]"#,
                expected: FrameAction::Ignore,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = handle_text(test.input, Some("1"));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
