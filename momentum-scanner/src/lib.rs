/// Momentum Scanner - Client Library
///
/// Shared pieces of the `momentum-scanner` terminal binary:
/// - Configuration read from `MOMENTUM_*` environment variables
/// - REST client for the initial snapshot and account actions
/// - Push channel client with automatic reconnection
/// - View state and key handling, testable without a terminal
/// - Single store writer that drops REST results from earlier push sessions
pub mod app;
pub mod config;
pub mod error;
pub mod rest;
pub mod socket;
pub mod writer;

// Re-export commonly used types for convenience
pub use app::{App, Command};
pub use config::ScannerConfig;
pub use error::ClientError;
pub use rest::{ActionResponse, ApiClient};
pub use socket::{ChannelEvent, ConnectionStatus, PushClient, PushConfig};
pub use writer::{Session, StoreInput, WriteOutcome, apply_input};
