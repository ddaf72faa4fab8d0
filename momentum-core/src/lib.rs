/// Momentum Core - Scanner Engine
///
/// Pure, I/O free building blocks of the momentum scanner:
/// - Ticker record model and push event decoding
/// - Technical indicator engine (EMA, SMA, Bollinger Bands, MACD, RSI, VWAP)
/// - Indicator classifier and the "all green" / "green count" predicates
/// - Copy-on-write ticker state store
/// - Display selection pipeline
/// - Chart adapter with linked time axes
/// - Socket.IO frame codec for the push channel
pub mod channel;
pub mod chart;
pub mod classify;
pub mod error;
pub mod event;
pub mod indicators;
pub mod selection;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use channel::{Frame, Handshake};
pub use chart::{ChartSeries, Pane, TimeScaleSync, VisibleRange};
pub use classify::{GREEN_CHECKS, Quality, check_all_green, classify, green_indicator_count};
pub use error::ScannerError;
pub use event::{PositionBook, PushEvent};
pub use selection::{Selection, SelectionConfig, SelectionTag, select};
pub use store::{StockStore, StoreSnapshot};
pub use types::{Candle, Indicators, MarketContext, Position, Scores, StockRecord};
