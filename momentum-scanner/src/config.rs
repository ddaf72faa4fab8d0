/// Scanner configuration, read from the environment
use crate::error::ClientError;
use momentum_core::SelectionConfig;
use std::time::Duration;

pub const ENV_API_URL: &str = "MOMENTUM_API_URL";
pub const ENV_WS_URL: &str = "MOMENTUM_WS_URL";
pub const ENV_TOKEN: &str = "MOMENTUM_TOKEN";
pub const ENV_ACCOUNT_ID: &str = "MOMENTUM_ACCOUNT_ID";
pub const ENV_TICK_MS: &str = "MOMENTUM_TICK_MS";
pub const ENV_MAX_TICKERS: &str = "MOMENTUM_MAX_TICKERS";
pub const ENV_SESSION_GAINERS: &str = "MOMENTUM_SESSION_GAINERS";
pub const ENV_LOG_FILE: &str = "MOMENTUM_LOG_FILE";

/// Scanner client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// REST base URL, including the `/api` prefix
    pub api_url: String,
    /// Push channel server URL (`ws://`, `wss://`, `http://` or `https://`)
    pub ws_url: String,
    /// Bearer token for authenticated endpoints
    pub token: Option<String>,
    /// Broker account id, used to match account scoped push events
    pub account_id: Option<String>,
    /// UI refresh interval
    pub tick_rate: Duration,
    /// Reconnection delay after the push channel drops
    pub reconnect_delay: Duration,
    /// REST request timeout
    pub request_timeout: Duration,
    /// Maximum channel buffer size for push events
    pub channel_buffer_size: usize,
    /// Log file path
    pub log_file: String,
    pub selection: SelectionConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/api".to_string(),
            ws_url: "ws://127.0.0.1:5000".to_string(),
            token: None,
            account_id: None,
            tick_rate: Duration::from_millis(250),
            reconnect_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
            channel_buffer_size: 10_000,
            log_file: "momentum-scanner.log".to_string(),
            selection: SelectionConfig::default(),
        }
    }
}

impl ScannerConfig {
    /// Build the configuration from `MOMENTUM_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(api_url) = lookup(ENV_API_URL) {
            config.api_url = api_url;
        }
        if let Some(ws_url) = lookup(ENV_WS_URL) {
            config.ws_url = ws_url;
        }
        if let Some(log_file) = lookup(ENV_LOG_FILE) {
            config.log_file = log_file;
        }
        config.token = lookup(ENV_TOKEN);
        config.account_id = lookup(ENV_ACCOUNT_ID);

        if let Some(tick_ms) = parse::<u64>(ENV_TICK_MS, lookup(ENV_TICK_MS))? {
            config.tick_rate = Duration::from_millis(tick_ms.max(1));
        }
        if let Some(max_tickers) = parse::<usize>(ENV_MAX_TICKERS, lookup(ENV_MAX_TICKERS))? {
            config.selection.max_tickers = max_tickers;
        }
        if let Some(gainers) = parse::<usize>(ENV_SESSION_GAINERS, lookup(ENV_SESSION_GAINERS))? {
            config.selection.session_gainers = gainers;
        }

        Ok(config)
    }

    /// Set REST base URL
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set push channel URL
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Set bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set UI refresh interval
    pub fn with_tick_rate(mut self, tick_rate: Duration) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set selection caps
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, ClientError>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ClientError::Config(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.api_url, "http://127.0.0.1:5000/api");
        assert_eq!(config.ws_url, "ws://127.0.0.1:5000");
        assert_eq!(config.selection.max_tickers, 20);
        assert_eq!(config.selection.session_gainers, 3);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ScannerConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://scanner.example/api"),
            (ENV_TOKEN, " abc "),
            (ENV_ACCOUNT_ID, ""),
            (ENV_TICK_MS, "500"),
            (ENV_MAX_TICKERS, "10"),
            (ENV_SESSION_GAINERS, "5"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://scanner.example/api");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.account_id, None);
        assert_eq!(config.tick_rate, Duration::from_millis(500));
        assert_eq!(config.selection.max_tickers, 10);
        assert_eq!(config.selection.session_gainers, 5);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let error = ScannerConfig::from_lookup(lookup(&[(ENV_MAX_TICKERS, "lots")])).unwrap_err();
        assert!(matches!(error, ClientError::Config(_)));
    }

    #[test]
    fn test_config_builder() {
        let config = ScannerConfig::default()
            .with_api_url("http://localhost:8080/api")
            .with_ws_url("ws://localhost:8080")
            .with_token("t")
            .with_tick_rate(Duration::from_secs(1))
            .with_reconnect_delay(Duration::from_secs(5));

        assert_eq!(config.api_url, "http://localhost:8080/api");
        assert_eq!(config.ws_url, "ws://localhost:8080");
        assert_eq!(config.token.as_deref(), Some("t"));
        assert_eq!(config.tick_rate, Duration::from_secs(1));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }
}
