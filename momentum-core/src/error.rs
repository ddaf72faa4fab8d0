use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `momentum-core`.
///
/// None of these are fatal: a push event or frame that fails to decode is dropped and the
/// store is left untouched.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum ScannerError {
    #[error("event {event} is missing a ticker")]
    MissingTicker { event: String },

    #[error("unknown push event: {0}")]
    UnknownEvent(String),

    #[error("invalid payload for event {event}: {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("invalid channel frame: {0}")]
    Frame(String),
}

impl ScannerError {
    /// Determine if the error was caused by a malformed or partial payload, as opposed to an
    /// event this client does not know about.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_malformed(&self) -> bool {
        match self {
            ScannerError::MissingTicker { .. }
            | ScannerError::InvalidPayload { .. }
            | ScannerError::Frame(_) => true,
            ScannerError::UnknownEvent(_) => false,
        }
    }

    pub(crate) fn invalid(event: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidPayload {
            event: event.to_string(),
            reason: reason.to_string(),
        }
    }
}
