//! In-memory ticker state.
//!
//! Merges arbitrarily ordered, partial push events into one record per ticker. Records are
//! shared behind `Arc` and mutated copy-on-write, so a [`StoreSnapshot`] taken before an event
//! never observes it.

use crate::{
    error::ScannerError,
    event::{PositionBook, PushEvent},
    types::{CandleUpsert, MarketContext, Position, StockRecord},
};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct StockStore {
    records: IndexMap<String, Arc<StockRecord>>,
    market_context: Option<Arc<MarketContext>>,
    /// Latest positions per broker book
    position_books: IndexMap<PositionBook, IndexMap<String, Position>>,
    /// Union of `position_books`
    positions: Arc<IndexMap<String, Position>>,
    /// Incremented on every applied event
    version: u64,
}

/// Immutable view of the store at one point in time.
#[derive(Clone, Debug, Default)]
pub struct StoreSnapshot {
    pub records: IndexMap<String, Arc<StockRecord>>,
    pub market_context: Option<Arc<MarketContext>>,
    pub positions: Arc<IndexMap<String, Position>>,
    pub version: u64,
}

impl StoreSnapshot {
    pub fn get(&self, ticker: &str) -> Option<&StockRecord> {
        self.records.get(ticker).map(Arc::as_ref)
    }

    pub fn records(&self) -> impl Iterator<Item = &StockRecord> {
        self.records.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply one push-channel event.
    ///
    /// A payload that fails to decode is rejected without touching the store.
    pub fn apply_event(&mut self, name: &str, payload: Value) -> Result<(), ScannerError> {
        let event = PushEvent::decode(name, payload)?;
        self.apply(event);
        Ok(())
    }

    /// Apply a decoded event. Only the fields carried by the event change.
    pub fn apply(&mut self, event: PushEvent) {
        self.version += 1;

        match event {
            PushEvent::MarketContext(context) => {
                self.market_context = Some(Arc::new(context));
            }
            PushEvent::Positions {
                book, positions, ..
            } => {
                self.apply_positions(book, positions);
            }
            PushEvent::Unsubscribe { ticker } => {
                if self.records.shift_remove(&ticker).is_some() {
                    debug!(%ticker, "removed unsubscribed ticker");
                }
            }
            PushEvent::StockUpdate(patch) => {
                let ticker = patch.ticker.clone();
                self.record_mut(&ticker).merge(patch);
            }
            PushEvent::Indicators { ticker, indicators } => {
                self.record_mut(&ticker).merge_indicators(indicators);
            }
            PushEvent::Scores { ticker, scores } => {
                self.record_mut(&ticker).merge_scores(scores);
            }
            PushEvent::Price { ticker, price } => {
                self.record_mut(&ticker).price = Some(price);
            }
            PushEvent::Volume { ticker, volume } => {
                self.record_mut(&ticker).volume = Some(volume);
            }
            PushEvent::PrevClose {
                ticker,
                prev_close_price,
            } => {
                self.record_mut(&ticker).prev_close_price = Some(prev_close_price);
            }
            PushEvent::Candle { ticker, candle } => {
                if self.record_mut(&ticker).upsert_candle(candle) == CandleUpsert::Appended {
                    debug!(%ticker, time = candle.time, "appended candle");
                }
            }
            PushEvent::CandleHistory { ticker, candles } => {
                let record = self.record_mut(&ticker);
                let count = candles.len();
                for candle in candles {
                    record.upsert_candle(candle);
                }
                debug!(%ticker, count, "loaded candle history");
            }
            PushEvent::FireEmoji { ticker, active } => {
                self.record_mut(&ticker).fire_emoji_status = Some(active);
            }
            PushEvent::ExplosionEmoji { ticker, active } => {
                self.record_mut(&ticker).explosion_emoji_status = Some(active);
            }
            PushEvent::Narrative { ticker, narrative } => {
                self.record_mut(&ticker).narrative = narrative;
            }
            PushEvent::Strategy { ticker, strategy } => {
                self.record_mut(&ticker).strategy = strategy;
            }
            PushEvent::OrderBook { ticker, orderbook } => {
                self.record_mut(&ticker).orderbook = Some(orderbook);
            }
        }
    }

    /// Merge a bulk `get_stock_data` result, returning the number of records applied.
    pub fn apply_snapshot<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = StockRecord>,
    {
        let mut applied = 0;
        for record in records {
            if record.ticker.is_empty() {
                continue;
            }
            self.apply(PushEvent::StockUpdate(record));
            applied += 1;
        }
        applied
    }

    /// Drop all state, eg/ on reconnect.
    pub fn clear(&mut self) {
        self.records.clear();
        self.market_context = None;
        self.position_books.clear();
        self.positions = Arc::default();
        self.version += 1;
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            records: self.records.clone(),
            market_context: self.market_context.clone(),
            positions: Arc::clone(&self.positions),
            version: self.version,
        }
    }

    pub fn get(&self, ticker: &str) -> Option<&StockRecord> {
        self.records.get(ticker).map(Arc::as_ref)
    }

    pub fn market_context(&self) -> Option<&MarketContext> {
        self.market_context.as_deref()
    }

    pub fn positions(&self) -> &IndexMap<String, Position> {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace one book and rebuild the union.
    ///
    /// A whole-account load replaces every book. A cash or margin update replaces its own book
    /// and supersedes the last whole-account load. On a ticker held in two books the later
    /// book wins.
    fn apply_positions(&mut self, book: PositionBook, positions: IndexMap<String, Position>) {
        match book {
            PositionBook::Account => self.position_books.clear(),
            PositionBook::Cash | PositionBook::Margin => {
                self.position_books.shift_remove(&PositionBook::Account);
            }
        }
        self.position_books.insert(book, positions);

        let union = self
            .position_books
            .values()
            .flat_map(|book| book.iter().map(|(ticker, position)| (ticker.clone(), position.clone())))
            .collect();
        self.positions = Arc::new(union);
    }

    fn record_mut(&mut self, ticker: &str) -> &mut StockRecord {
        let record = self
            .records
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(StockRecord::new(ticker)));

        Arc::make_mut(record)
    }
}
