//! REST client for the backend `/api` routes.

use crate::{config::ScannerConfig, error::ClientError};
use momentum_core::{Candle, MarketContext, PushEvent, StockRecord};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// `{success, error}` envelope returned by the action routes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionResponse {
    pub success: bool,
    pub enabled: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct BuyFeaturesStatus {
    enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ScannerConfig) -> Result<Self, ClientError> {
        // Validate early so a bad URL is a configuration error, not a request failure
        url::Url::parse(&config.api_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// `GET /get_market_context`
    pub async fn market_context(&self) -> Result<PushEvent, ClientError> {
        let context: Option<MarketContext> = self.get("get_market_context", &[]).await?;
        Ok(PushEvent::MarketContext(context.unwrap_or_default()))
    }

    /// `GET /get_stock_data`, the bulk initial snapshot.
    ///
    /// Records that fail to decode are skipped so one bad ticker does not block the rest.
    pub async fn stock_data(&self) -> Result<Vec<StockRecord>, ClientError> {
        let raw: Value = self.get("get_stock_data", &[]).await?;
        decode_stock_data(raw)
    }

    /// `GET /get_candles?ticker=`
    pub async fn candles(&self, ticker: &str) -> Result<PushEvent, ClientError> {
        let raw: Value = self.get("get_candles", &[("ticker", ticker)]).await?;
        Ok(PushEvent::CandleHistory {
            ticker: ticker.to_string(),
            candles: decode_candles(raw),
        })
    }

    /// `GET /get_positions`
    pub async fn positions(&self) -> Result<PushEvent, ClientError> {
        let raw: Value = self.get("get_positions", &[]).await?;
        PushEvent::positions(raw).map_err(|e| ClientError::decode("get_positions", e))
    }

    /// `GET /get_buy_features_status`
    pub async fn buy_features_status(&self) -> Result<bool, ClientError> {
        let status: BuyFeaturesStatus = self.get("get_buy_features_status", &[]).await?;
        Ok(status.enabled)
    }

    /// `POST /toggle_buy_features {enabled}`, returning the new state.
    pub async fn toggle_buy_features(&self, enabled: bool) -> Result<bool, ClientError> {
        let response = self
            .action("toggle_buy_features", json!({ "enabled": enabled }))
            .await?;
        Ok(response.enabled.unwrap_or(enabled))
    }

    /// `POST /exit_position {ticker}`
    pub async fn exit_position(&self, ticker: &str) -> Result<ActionResponse, ClientError> {
        self.action("exit_position", json!({ "ticker": ticker }))
            .await
    }

    /// Exit a position, then reload positions once the exit was accepted.
    ///
    /// The reload is only issued after the exit response, so it reflects the exit.
    pub async fn exit_and_reload_positions(&self, ticker: &str) -> Result<PushEvent, ClientError> {
        self.exit_position(ticker).await?;
        self.positions().await
    }

    async fn action(&self, endpoint: &str, body: Value) -> Result<ActionResponse, ClientError> {
        let request = self.http.post(self.endpoint_url(endpoint)).json(&body);
        let response: ActionResponse = self.send(endpoint, request).await?;

        if response.success {
            Ok(response)
        } else {
            Err(ClientError::Rejected {
                endpoint: endpoint.to_string(),
                reason: response
                    .error
                    .unwrap_or_else(|| "request was not accepted".to_string()),
            })
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T, ClientError> {
        let request = self.http.get(self.endpoint_url(endpoint)).query(query);
        self.send(endpoint, request).await
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        debug!("Requesting {}", endpoint);
        let response = request.send().await.map_err(|e| ClientError::Http {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::decode(endpoint, e))
    }
}

/// Accept the array the backend serves, or a map keyed by ticker.
pub fn decode_stock_data(raw: Value) -> Result<Vec<StockRecord>, ClientError> {
    let items: Vec<(Option<String>, Value)> = match raw {
        Value::Array(items) => items.into_iter().map(|item| (None, item)).collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(ticker, item)| (Some(ticker), item))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(ClientError::decode(
                "get_stock_data",
                format!("expected array or map, got {other}"),
            ));
        }
    };

    let records = items
        .into_iter()
        .filter(|(_, item)| !item.is_null())
        .filter_map(|(key, item)| match serde_json::from_value::<StockRecord>(item) {
            Ok(mut record) => {
                if record.ticker.is_empty() {
                    record.ticker = key.unwrap_or_default();
                }
                Some(record)
            }
            Err(e) => {
                warn!("Skipping undecodable stock record: {}", e);
                None
            }
        })
        .collect();

    Ok(records)
}

/// Accept a candle list or `{"candles": [...]}`; undecodable candles are skipped.
pub fn decode_candles(raw: Value) -> Vec<Candle> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("candles") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Candle>(item).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    /// Answer `bodies.len()` requests in order, one connection each, returning the request lines.
    async fn serve(listener: TcpListener, bodies: Vec<&'static str>) -> Vec<String> {
        let mut request_lines = Vec::new();
        for body in bodies {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            request_lines.push(request.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        request_lines
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&buffer);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    async fn local_client() -> (ApiClient, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let config = ScannerConfig::default().with_api_url(format!("http://{address}/api"));
        (ApiClient::new(&config).unwrap(), listener)
    }

    #[tokio::test]
    async fn test_exit_then_reload_positions() {
        let (client, listener) = local_client().await;
        let server = tokio::spawn(serve(
            listener,
            vec![r#"{"success": true}"#, r#"{"BBB": {"qty": 5}}"#],
        ));

        let event = client.exit_and_reload_positions("AAA").await.unwrap();
        let request_lines = server.await.unwrap();

        assert!(request_lines[0].starts_with("POST /api/exit_position"));
        assert!(request_lines[1].starts_with("GET /api/get_positions"));
        assert!(matches!(
            event,
            PushEvent::Positions { positions, .. } if positions.keys().eq(["BBB"])
        ));
    }

    #[tokio::test]
    async fn test_rejected_exit_skips_reload() {
        let (client, listener) = local_client().await;
        let server = tokio::spawn(serve(
            listener,
            vec![r#"{"success": false, "error": "No positions found"}"#],
        ));

        let error = client.exit_and_reload_positions("AAA").await.unwrap_err();
        let request_lines = server.await.unwrap();

        assert_eq!(request_lines.len(), 1);
        assert_eq!(
            error,
            ClientError::Rejected {
                endpoint: "exit_position".to_string(),
                reason: "No positions found".to_string(),
            }
        );
    }

    #[test]
    fn test_endpoint_url() {
        let config = ScannerConfig::default().with_api_url("http://127.0.0.1:5000/api/");
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint_url("get_stock_data"),
            "http://127.0.0.1:5000/api/get_stock_data"
        );

        let config = ScannerConfig::default().with_api_url("::nope");
        assert!(matches!(ApiClient::new(&config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_decode_stock_data() {
        let records = decode_stock_data(json!([
            {"ticker": "AAA", "price": 5.0, "mode": ["rapid_gainer"]},
            null,
            {"ticker": "BBB", "price": "bad"},
            {"ticker": "CCC"}
        ]))
        .unwrap();
        assert_eq!(
            records.iter().map(|r| r.ticker.as_str()).collect::<Vec<_>>(),
            vec!["AAA", "CCC"]
        );

        let records = decode_stock_data(json!({"DDD": {"price": 1.0}})).unwrap();
        assert_eq!(records[0].ticker, "DDD");

        assert!(decode_stock_data(json!(42)).is_err());
    }

    #[test]
    fn test_decode_candles() {
        let candles = decode_candles(json!([
            {"timestamp": "2024-03-01 14:30:00", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 100},
            {"open": 1.0},
            {"time": 1_709_303_460, "open": 1.5, "high": 2.0, "low": 1.0, "close": 1.8, "volume": 50}
        ]));
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].time - candles[0].time, 60);

        assert_eq!(decode_candles(json!({"candles": []})), vec![]);
        assert!(decode_candles(Value::Null).is_empty());
    }

    #[test]
    fn test_action_response_defaults() {
        let response: ActionResponse =
            serde_json::from_value(json!({"success": false, "error": "No positions found"})).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("No positions found"));
        assert_eq!(response.enabled, None);
    }
}
