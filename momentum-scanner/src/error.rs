use momentum_core::ScannerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated by the scanner client.
///
/// REST and socket failures are surfaced in the view as a retryable "failed to load" state and
/// never end the process.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum ClientError {
    #[error("HTTP request to {endpoint} failed: {reason}")]
    Http { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("{endpoint} rejected the request: {reason}")]
    Rejected { endpoint: String, reason: String },

    #[error("push channel error: {0}")]
    Socket(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("terminal error: {0}")]
    Terminal(String),
}

impl ClientError {
    /// Determine if the failed operation may succeed when retried by the user.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http { .. } | ClientError::Socket(_) => true,
            ClientError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn decode(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<ScannerError> for ClientError {
    fn from(error: ScannerError) -> Self {
        match error {
            ScannerError::Frame(reason) => ClientError::Socket(reason),
            other => ClientError::Decode {
                endpoint: "payload".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(error: url::ParseError) -> Self {
        ClientError::Config(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Socket(error.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        ClientError::Terminal(error.to_string())
    }
}
