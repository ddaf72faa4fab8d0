use crate::{
    error::ScannerError,
    types::{Candle, Indicators, MarketContext, Narrative, OrderBook, Position, Scores, StockRecord, Strategy},
};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Account scoped position event prefixes. The REST docs call it `positions_update_{id}`,
/// the backend broadcasts `cash_positions_{id}` and `margin_positions_{id}`.
const POSITION_PREFIXES: [(&str, PositionBook); 3] = [
    ("positions_update_", PositionBook::Account),
    ("cash_positions_", PositionBook::Cash),
    ("margin_positions_", PositionBook::Margin),
];

/// Broker book a positions event replaces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PositionBook {
    /// Every position of the account, from `positions_update_{id}` or `GET /get_positions`
    Account,
    Cash,
    Margin,
}

/// Typed push event, decoded from an event name and its JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    MarketContext(MarketContext),
    StockUpdate(StockRecord),
    Indicators { ticker: String, indicators: Indicators },
    Scores { ticker: String, scores: Scores },
    Price { ticker: String, price: f64 },
    Volume { ticker: String, volume: f64 },
    PrevClose { ticker: String, prev_close_price: f64 },
    Candle { ticker: String, candle: Candle },
    /// Bulk candle load from `GET /get_candles`
    CandleHistory { ticker: String, candles: Vec<Candle> },
    FireEmoji { ticker: String, active: bool },
    ExplosionEmoji { ticker: String, active: bool },
    /// `None` clears the narrative
    Narrative { ticker: String, narrative: Option<Narrative> },
    /// `None` clears a finished strategy
    Strategy { ticker: String, strategy: Option<Strategy> },
    OrderBook { ticker: String, orderbook: OrderBook },
    Unsubscribe { ticker: String },
    Positions {
        /// Account id taken from the event name suffix
        account_id: Option<String>,
        book: PositionBook,
        positions: IndexMap<String, Position>,
    },
}

impl PushEvent {
    /// Decode a push-channel event.
    ///
    /// Ticker keyed payloads without a non-empty `ticker` are rejected with
    /// [`ScannerError::MissingTicker`], unrecognised names with [`ScannerError::UnknownEvent`].
    pub fn decode(name: &str, payload: Value) -> Result<Self, ScannerError> {
        let account = POSITION_PREFIXES
            .iter()
            .find_map(|(prefix, book)| Some((*book, name.strip_prefix(prefix)?)));
        if let Some((book, account_id)) = account {
            return Ok(PushEvent::Positions {
                account_id: Some(account_id.to_string()).filter(|id| !id.is_empty()),
                book,
                positions: decode_positions(name, payload)?,
            });
        }

        match name {
            "market_context" => serde_json::from_value(payload)
                .map(PushEvent::MarketContext)
                .map_err(|e| ScannerError::invalid(name, e)),
            "stock_update" => {
                let record: StockRecord =
                    serde_json::from_value(payload).map_err(|e| ScannerError::invalid(name, e))?;
                if record.ticker.is_empty() {
                    return Err(missing_ticker(name));
                }
                Ok(PushEvent::StockUpdate(record))
            }
            "indicators" => Ok(PushEvent::Indicators {
                ticker: ticker(name, &payload)?,
                indicators: field(name, &payload, "indicators")?,
            }),
            "scores" => Ok(PushEvent::Scores {
                ticker: ticker(name, &payload)?,
                scores: field(name, &payload, "scores")?,
            }),
            "stock_price" => Ok(PushEvent::Price {
                ticker: ticker(name, &payload)?,
                price: field(name, &payload, "price")?,
            }),
            "stock_volume" => Ok(PushEvent::Volume {
                ticker: ticker(name, &payload)?,
                volume: field(name, &payload, "volume")?,
            }),
            "prev_close_price" => Ok(PushEvent::PrevClose {
                ticker: ticker(name, &payload)?,
                prev_close_price: field(name, &payload, "prev_close_price")?,
            }),
            "candle" => Ok(PushEvent::Candle {
                ticker: ticker(name, &payload)?,
                candle: field(name, &payload, "candle")?,
            }),
            "fire_emoji_status" => Ok(PushEvent::FireEmoji {
                ticker: ticker(name, &payload)?,
                active: field(name, &payload, "fire_emoji_status")?,
            }),
            "explosion_emoji_status" => Ok(PushEvent::ExplosionEmoji {
                ticker: ticker(name, &payload)?,
                active: field(name, &payload, "explosion_emoji_status")?,
            }),
            "coaching_narrative" => Ok(PushEvent::Narrative {
                ticker: ticker(name, &payload)?,
                narrative: field(name, &payload, "narrative")?,
            }),
            "strategy" => Ok(PushEvent::Strategy {
                ticker: ticker(name, &payload)?,
                strategy: field(name, &payload, "strategy")?,
            }),
            "orderbook" => Ok(PushEvent::OrderBook {
                ticker: ticker(name, &payload)?,
                orderbook: field(name, &payload, "orderbook")?,
            }),
            "unsubscribe" => Ok(PushEvent::Unsubscribe {
                ticker: ticker(name, &payload)?,
            }),
            other => Err(ScannerError::UnknownEvent(other.to_string())),
        }
    }

    /// Whole-account positions from the `get_positions` response.
    pub fn positions(payload: Value) -> Result<Self, ScannerError> {
        Ok(PushEvent::Positions {
            account_id: None,
            book: PositionBook::Account,
            positions: decode_positions("positions", payload)?,
        })
    }

    /// Whether this event belongs to `account_id`.
    ///
    /// Only position events carry an account; with no account configured every event matches.
    pub fn is_for_account(&self, account_id: Option<&str>) -> bool {
        match (self, account_id) {
            (
                PushEvent::Positions {
                    account_id: Some(event_account),
                    ..
                },
                Some(account_id),
            ) => event_account == account_id,
            _ => true,
        }
    }

    /// Ticker this event targets, `None` for market wide and account events.
    pub fn ticker(&self) -> Option<&str> {
        match self {
            PushEvent::MarketContext(_) | PushEvent::Positions { .. } => None,
            PushEvent::StockUpdate(record) => Some(&record.ticker),
            PushEvent::Indicators { ticker, .. }
            | PushEvent::Scores { ticker, .. }
            | PushEvent::Price { ticker, .. }
            | PushEvent::Volume { ticker, .. }
            | PushEvent::PrevClose { ticker, .. }
            | PushEvent::Candle { ticker, .. }
            | PushEvent::CandleHistory { ticker, .. }
            | PushEvent::FireEmoji { ticker, .. }
            | PushEvent::ExplosionEmoji { ticker, .. }
            | PushEvent::Narrative { ticker, .. }
            | PushEvent::Strategy { ticker, .. }
            | PushEvent::OrderBook { ticker, .. }
            | PushEvent::Unsubscribe { ticker } => Some(ticker),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PushEvent::MarketContext(_) => "market_context",
            PushEvent::StockUpdate(_) => "stock_update",
            PushEvent::Indicators { .. } => "indicators",
            PushEvent::Scores { .. } => "scores",
            PushEvent::Price { .. } => "stock_price",
            PushEvent::Volume { .. } => "stock_volume",
            PushEvent::PrevClose { .. } => "prev_close_price",
            PushEvent::Candle { .. } => "candle",
            PushEvent::CandleHistory { .. } => "candle_history",
            PushEvent::FireEmoji { .. } => "fire_emoji_status",
            PushEvent::ExplosionEmoji { .. } => "explosion_emoji_status",
            PushEvent::Narrative { .. } => "coaching_narrative",
            PushEvent::Strategy { .. } => "strategy",
            PushEvent::OrderBook { .. } => "orderbook",
            PushEvent::Unsubscribe { .. } => "unsubscribe",
            PushEvent::Positions { .. } => "positions",
        }
    }
}

fn missing_ticker(event: &str) -> ScannerError {
    ScannerError::MissingTicker {
        event: event.to_string(),
    }
}

fn ticker(event: &str, payload: &Value) -> Result<String, ScannerError> {
    payload
        .get("ticker")
        .and_then(Value::as_str)
        .filter(|ticker| !ticker.is_empty())
        .map(str::to_string)
        .ok_or_else(|| missing_ticker(event))
}

fn field<T: DeserializeOwned>(event: &str, payload: &Value, key: &str) -> Result<T, ScannerError> {
    let value = payload
        .get(key)
        .ok_or_else(|| ScannerError::invalid(event, format!("missing field `{key}`")))?;

    serde_json::from_value(value.clone())
        .map_err(|e| ScannerError::invalid(event, format!("`{key}`: {e}")))
}

fn decode_positions(event: &str, payload: Value) -> Result<IndexMap<String, Position>, ScannerError> {
    // Either the bare ticker map or `{"positions": {...}}`
    let payload = match payload {
        Value::Object(mut object) if object.contains_key("positions") => object
            .remove("positions")
            .unwrap_or(Value::Null),
        other => other,
    };

    let mut positions: IndexMap<String, Position> =
        serde_json::from_value(payload).map_err(|e| ScannerError::invalid(event, e))?;

    for (ticker, position) in positions.iter_mut() {
        position.ticker.get_or_insert_with(|| ticker.clone());
    }

    Ok(positions)
}
