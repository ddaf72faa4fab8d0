//! Socket.IO v5 / Engine.IO v4 text frame codec for the push channel.
//!
//! Only the subset the scanner needs: handshake, heartbeat, namespace connect and events.

use crate::error::ScannerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string selecting Engine.IO v4 over a raw WebSocket
pub const ENGINE_IO_QUERY: &str = "EIO=4&transport=websocket";

/// Default Socket.IO mount path
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Engine.IO open packet payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds
    pub ping_interval: u64,
    /// Milliseconds
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace connected
    Connect,
    /// Namespace disconnected by the server
    Disconnect,
    Event { name: String, payload: Value },
    /// Acknowledgement of a client emit, ignored
    Ack,
    ConnectError(String),
}

impl Frame {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, ScannerError> {
        let mut chars = text.chars();
        let engine_type = chars.next().ok_or_else(|| frame_error(text, "empty frame"))?;
        let rest = chars.as_str();

        match engine_type {
            '0' => serde_json::from_str(rest)
                .map(Frame::Open)
                .map_err(|e| frame_error(text, e)),
            '1' => Ok(Frame::Close),
            '2' => Ok(Frame::Ping),
            '3' => Ok(Frame::Pong),
            '4' => decode_socket_packet(text, rest),
            '6' => Ok(Frame::Noop),
            _ => Err(frame_error(text, "unknown engine packet type")),
        }
    }

    /// Encode a frame the client sends.
    pub fn encode(&self) -> String {
        match self {
            Frame::Open(handshake) => format!(
                "0{}",
                serde_json::to_string(handshake).unwrap_or_default()
            ),
            Frame::Close => "1".to_string(),
            Frame::Ping => "2".to_string(),
            Frame::Pong => "3".to_string(),
            Frame::Noop => "6".to_string(),
            Frame::Connect => "40".to_string(),
            Frame::Disconnect => "41".to_string(),
            Frame::Event { name, payload } => format!(
                "42{}",
                Value::Array(vec![Value::String(name.clone()), payload.clone()])
            ),
            Frame::Ack => "43".to_string(),
            Frame::ConnectError(message) => {
                format!("44{}", serde_json::json!({ "message": message }))
            }
        }
    }
}

fn frame_error(text: &str, reason: impl std::fmt::Display) -> ScannerError {
    // Frames can be large, keep the error readable
    let head = text.chars().take(64).collect::<String>();
    ScannerError::Frame(format!("{reason}: {head}"))
}

fn decode_socket_packet(text: &str, packet: &str) -> Result<Frame, ScannerError> {
    let mut chars = packet.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| frame_error(text, "empty socket packet"))?;
    let body = skip_ack_id(skip_namespace(chars.as_str()));

    match socket_type {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => decode_event(text, body),
        '3' => Ok(Frame::Ack),
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|value| match value {
                    Value::String(message) => Some(message),
                    Value::Object(object) => object
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .unwrap_or_else(|| body.to_string());
            Ok(Frame::ConnectError(message))
        }
        _ => Err(frame_error(text, "unknown socket packet type")),
    }
}

/// Strip an optional `/namespace,` prefix.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

/// Strip optional ack id digits.
fn skip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(text: &str, body: &str) -> Result<Frame, ScannerError> {
    let items: Vec<Value> = serde_json::from_str(body).map_err(|e| frame_error(text, e))?;
    let mut items = items.into_iter();

    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(frame_error(text, "event without a name")),
    };

    Ok(Frame::Event {
        name,
        payload: items.next().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_frames() {
        struct TestCase {
            input: &'static str,
            expected: Frame,
        }

        let tests = vec![
            TestCase {
                // TC0: engine open
                input: r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
                expected: Frame::Open(Handshake {
                    sid: "abc".to_string(),
                    upgrades: vec![],
                    ping_interval: 25_000,
                    ping_timeout: 20_000,
                }),
            },
            TestCase {
                // TC1: heartbeat
                input: "2",
                expected: Frame::Ping,
            },
            TestCase {
                // TC2: namespace connect with sid
                input: r#"40{"sid":"xyz"}"#,
                expected: Frame::Connect,
            },
            TestCase {
                // TC3: event
                input: r#"42["stock_price",{"ticker":"AAA","price":5.0}]"#,
                expected: Frame::Event {
                    name: "stock_price".to_string(),
                    payload: json!({"ticker": "AAA", "price": 5.0}),
                },
            },
            TestCase {
                // TC4: event on a namespace with an ack id
                input: r#"42/market,17["unsubscribe",{"ticker":"AAA"}]"#,
                expected: Frame::Event {
                    name: "unsubscribe".to_string(),
                    payload: json!({"ticker": "AAA"}),
                },
            },
            TestCase {
                // TC5: event without payload
                input: r#"42["refresh"]"#,
                expected: Frame::Event {
                    name: "refresh".to_string(),
                    payload: Value::Null,
                },
            },
            TestCase {
                // TC6: connect error
                input: r#"44{"message":"Not authorized"}"#,
                expected: Frame::ConnectError("Not authorized".to_string()),
            },
            TestCase {
                // TC7: server disconnect
                input: "41",
                expected: Frame::Disconnect,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = Frame::decode(test.input).unwrap();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_decode_garbage_is_frame_error() {
        for input in ["", "9", "4", "49", r#"42{"not":"an array"}"#, "42[1,2]"] {
            let error = Frame::decode(input).unwrap_err();
            assert!(matches!(error, ScannerError::Frame(_)), "{input:?}");
        }
    }

    #[test]
    fn test_encode_client_frames() {
        assert_eq!(Frame::Connect.encode(), "40");
        assert_eq!(Frame::Pong.encode(), "3");

        let event = Frame::Event {
            name: "subscribe".to_string(),
            payload: json!({"ticker": "AAA"}),
        };
        assert_eq!(Frame::decode(&event.encode()).unwrap(), event);
    }
}
