/// Core data types for the ticker records pushed by the backend
///
/// These types match the JSON shapes served by the REST API and broadcast over the push
/// channel. Every record field is optional: absence means "not yet known", never zero.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Indicator keys as emitted by the backend technical worker.
pub mod keys {
    pub const RVOL: &str = "RVol";
    pub const ATR_TO_VWAP: &str = "ATR_to_VWAP";
    pub const VOLUME_RATIO: &str = "Volume_Ratio";
    pub const ATR_TO_HOD: &str = "ATR_to_HOD";
    pub const VWAP_SLOPE: &str = "VWAP_Slope";
    pub const ZENP: &str = "ZenP";
    pub const ATR_SPREAD: &str = "ATR_Spread";
    pub const ROC: &str = "ROC";
    pub const ADX: &str = "ADX";
    pub const EMA5: &str = "EMA5";
    pub const VWAP: &str = "VWAP";
    pub const TREND: &str = "Trend";
    pub const SUPERTREND: &str = "Supertrend";

    /// Alternate spellings seen on the wire, mapped to their canonical key.
    pub(crate) const ALIASES: &[(&str, &str)] = &[("ZENP", ZENP), ("zenp", ZENP)];
}

/// Regime tags set by the backend scanners.
pub mod modes {
    pub const VWAP_CANDIDATE: &str = "vwap_candidate";
    pub const SESSION_GAINER: &str = "session_gainer";
    pub const RAPID_GAINER: &str = "rapid_gainer";
    pub const FIVE_MINUTE_GAINER: &str = "five_minute_gainer";
}

/// OHLCV aggregate over one time bucket.
///
/// Accepts either `time` (epoch seconds) or the backend's `timestamp`
/// (`"%Y-%m-%d %H:%M:%S"` in UTC, or epoch seconds/milliseconds) on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawCandle")]
pub struct Candle {
    /// Bucket start, epoch seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price (HLC3)
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Check if the candle closed at or above its open
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl TryFrom<RawCandle> for Candle {
    type Error = String;

    fn try_from(raw: RawCandle) -> Result<Self, Self::Error> {
        let time = match (raw.time, raw.timestamp) {
            (Some(time), _) => time,
            (None, Some(timestamp)) => parse_timestamp(&timestamp)?,
            (None, None) => return Err("candle has neither `time` nor `timestamp`".to_string()),
        };

        Ok(Candle {
            time,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        })
    }
}

/// Epoch seconds from a backend timestamp value.
fn parse_timestamp(value: &serde_json::Value) -> Result<i64, String> {
    match value {
        serde_json::Value::Number(number) => {
            let raw = number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f as i64))
                .ok_or_else(|| format!("invalid numeric timestamp {number}"))?;
            // Millisecond timestamps are 13 digits
            Ok(if raw > 100_000_000_000 { raw / 1000 } else { raw })
        }
        serde_json::Value::String(text) => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc().timestamp())
            .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.timestamp()))
            .map_err(|e| format!("invalid timestamp {text:?}: {e}")),
        other => Err(format!("invalid timestamp {other}")),
    }
}

/// Named indicator values for one ticker.
///
/// `null` values on the wire mean "unknown" and are dropped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, Option<f64>>")]
pub struct Indicators(BTreeMap<String, f64>);

impl Indicators {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(canonical_key(key.into()), value);
    }

    /// Merge another map in key by key; keys absent from `other` keep their value.
    pub fn merge(&mut self, other: Indicators) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

fn canonical_key(key: String) -> String {
    keys::ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}

impl From<BTreeMap<String, Option<f64>>> for Indicators {
    fn from(raw: BTreeMap<String, Option<f64>>) -> Self {
        Self(
            raw.into_iter()
                .filter_map(|(key, value)| {
                    value
                        .filter(|v| v.is_finite())
                        .map(|v| (canonical_key(key), v))
                })
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Indicators {
    fn from(values: [(&str, f64); N]) -> Self {
        let mut indicators = Indicators::default();
        for (key, value) in values {
            indicators.insert(key, value);
        }
        indicators
    }
}

impl Serialize for Indicators {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Composite scores computed by the backend (fractions in `0..=1`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Scores {
    pub technical_score: Option<f64>,
    pub confirmation_score: Option<f64>,
    pub volume_score: Option<f64>,
    pub momentum_score: Option<f64>,
    pub trend_score: Option<f64>,
    pub volatility_score: Option<f64>,
}

impl Scores {
    /// Merge field by field; fields absent from `other` keep their value.
    pub fn merge(&mut self, other: Scores) {
        let Scores {
            technical_score,
            confirmation_score,
            volume_score,
            momentum_score,
            trend_score,
            volatility_score,
        } = other;
        merge_opt(&mut self.technical_score, technical_score);
        merge_opt(&mut self.confirmation_score, confirmation_score);
        merge_opt(&mut self.volume_score, volume_score);
        merge_opt(&mut self.momentum_score, momentum_score);
        merge_opt(&mut self.trend_score, trend_score);
        merge_opt(&mut self.volatility_score, volatility_score);
    }
}

fn merge_opt<T>(current: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *current = update;
    }
}

/// One target level of a locked strategy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetLevel {
    pub price: f64,
    pub achieved: bool,
}

/// Strategy currently tracked by the backend for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Strategy {
    pub name: Option<String>,
    /// ANALYZING, LOCKED, COMPLETED or STOPPED
    pub state: Option<String>,
    pub entry_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub probability: Option<f64>,
    pub pattern_type: Option<String>,
    pub target_history: Vec<TargetLevel>,
}

/// Coaching message attached to a ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Narrative {
    pub state: Option<String>,
    pub message: Option<String>,
    pub confidence: Option<f64>,
    pub probability: Option<f64>,
    pub warning_reason: Option<String>,
    pub recommendations: Option<Vec<String>>,
    pub timestamp: Option<f64>,
}

/// Advisory note for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketNote {
    pub message: String,
    /// positive, warning or danger
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// critical, important or normal
    pub priority: Option<String>,
    pub icon: Option<String>,
    pub is_strategy: bool,
}

/// Price/size level in an order book
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

/// Top of book for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawOrderBook")]
pub struct OrderBook {
    pub best_bid: Option<BookLevel>,
    pub best_ask: Option<BookLevel>,
}

impl OrderBook {
    /// Calculate the bid-ask spread
    pub fn spread(&self) -> Option<f64> {
        match (&self.best_bid, &self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Calculate spread as a percentage of mid price
    pub fn spread_percentage(&self) -> Option<f64> {
        let (bid, ask) = (self.best_bid?, self.best_ask?);
        let mid = (bid.price + ask.price) / 2.0;
        (mid > 0.0).then(|| (ask.price - bid.price) / mid * 100.0)
    }
}

/// Either the broker depth shape (`Bid`/`Ask` arrays of `[price, size, ...]`) or our own
/// serialised `best_bid`/`best_ask`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOrderBook {
    #[serde(rename = "Bid", alias = "bids")]
    bid: Vec<Vec<serde_json::Value>>,
    #[serde(rename = "Ask", alias = "asks")]
    ask: Vec<Vec<serde_json::Value>>,
    best_bid: Option<BookLevel>,
    best_ask: Option<BookLevel>,
}

fn best_level(levels: &[Vec<serde_json::Value>]) -> Option<BookLevel> {
    let first = levels.first()?;
    Some(BookLevel {
        price: first.first()?.as_f64()?,
        size: first.get(1).and_then(|v| v.as_f64()).unwrap_or(0.0),
    })
}

impl From<RawOrderBook> for OrderBook {
    fn from(raw: RawOrderBook) -> Self {
        Self {
            best_bid: raw.best_bid.or_else(|| best_level(&raw.bid)),
            best_ask: raw.best_ask.or_else(|| best_level(&raw.ask)),
        }
    }
}

/// Market-wide context score (not ticker keyed).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketContext {
    pub score: Option<f64>,
    pub signal: Option<String>,
    pub timestamp: Option<String>,
    pub components: Option<serde_json::Value>,
}

/// Broker position for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Position {
    pub ticker: Option<String>,
    pub qty: f64,
    pub can_sell_qty: Option<f64>,
    pub average_cost: Option<f64>,
    pub pl_ratio: Option<f64>,
    pub pl_val: Option<f64>,
    pub today_pl_val: Option<f64>,
}

/// Outcome of upserting a candle into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleUpsert {
    Replaced,
    Appended,
}

/// Progressively enriched record for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StockRecord {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_close_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_share: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_30d_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candles: Option<Vec<Candle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<Indicators>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_notes: Option<Vec<MarketNote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderbook: Option<OrderBook>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_emoji_status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explosion_emoji_status: Option<bool>,
}

impl StockRecord {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    /// Structural merge of a partial record into this one.
    ///
    /// Only fields present in `patch` change. Indicator maps merge key by key, scores field by
    /// field and candles are upserted by timestamp.
    pub fn merge(&mut self, patch: StockRecord) {
        let StockRecord {
            ticker: _,
            mode,
            price,
            prev_close_price,
            volume,
            float_share,
            avg_30d_volume,
            candles,
            indicators,
            scores,
            strategy,
            narrative,
            market_notes,
            orderbook,
            fire_emoji_status,
            explosion_emoji_status,
        } = patch;

        merge_opt(&mut self.mode, mode);
        merge_opt(&mut self.price, price);
        merge_opt(&mut self.prev_close_price, prev_close_price);
        merge_opt(&mut self.volume, volume);
        merge_opt(&mut self.float_share, float_share);
        merge_opt(&mut self.avg_30d_volume, avg_30d_volume);
        merge_opt(&mut self.strategy, strategy);
        merge_opt(&mut self.narrative, narrative);
        merge_opt(&mut self.market_notes, market_notes);
        merge_opt(&mut self.orderbook, orderbook);
        merge_opt(&mut self.fire_emoji_status, fire_emoji_status);
        merge_opt(&mut self.explosion_emoji_status, explosion_emoji_status);

        if let Some(indicators) = indicators {
            self.merge_indicators(indicators);
        }
        if let Some(scores) = scores {
            self.merge_scores(scores);
        }
        if let Some(candles) = candles {
            for candle in candles {
                self.upsert_candle(candle);
            }
        }
    }

    pub fn merge_indicators(&mut self, indicators: Indicators) {
        self.indicators
            .get_or_insert_with(Indicators::default)
            .merge(indicators);
    }

    pub fn merge_scores(&mut self, scores: Scores) {
        self.scores.get_or_insert_with(Scores::default).merge(scores);
    }

    /// Replace the candle with the same timestamp in place, otherwise append.
    pub fn upsert_candle(&mut self, candle: Candle) -> CandleUpsert {
        let candles = self.candles.get_or_insert_with(Vec::new);

        // Updates almost always target the most recent bucket
        match candles.iter_mut().rev().find(|c| c.time == candle.time) {
            Some(existing) => {
                *existing = candle;
                CandleUpsert::Replaced
            }
            None => {
                candles.push(candle);
                CandleUpsert::Appended
            }
        }
    }

    /// Candles ordered by time ascending, as required by the indicator engine.
    pub fn sorted_candles(&self) -> Vec<Candle> {
        let mut candles = self.candles.clone().unwrap_or_default();
        candles.sort_by_key(|c| c.time);
        candles
    }

    pub fn has_mode(&self, mode: &str) -> bool {
        self.mode.as_ref().is_some_and(|modes| modes.contains(mode))
    }

    pub fn indicator(&self, key: &str) -> Option<f64> {
        self.indicators.as_ref().and_then(|i| i.get(key))
    }

    pub fn technical_score(&self) -> Option<f64> {
        self.scores.as_ref().and_then(|s| s.technical_score)
    }

    /// Fractional change from the previous close, if both prices are positive.
    pub fn percent_change(&self) -> Option<f64> {
        match (self.price, self.prev_close_price) {
            (Some(price), Some(prev)) if price > 0.0 && prev > 0.0 => Some((price - prev) / prev),
            _ => None,
        }
    }
}
