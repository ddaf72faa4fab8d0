//! View state of the terminal scanner, independent of rendering.

use crate::{error::ClientError, socket::ConnectionStatus};
use crossterm::event::KeyCode;
use momentum_core::{
    ChartSeries, Pane, Selection, SelectionConfig, StockRecord, StoreSnapshot, TimeScaleSync,
    select,
};
use std::sync::Arc;

/// Fraction of the visible width moved by one pan step
const PAN_FRACTION: f64 = 0.1;
/// Zoom factor applied by one zoom step
const ZOOM_STEP: f64 = 1.25;
/// Narrowest visible range, seconds
const MIN_VISIBLE_SECONDS: i64 = 5 * 60;

/// Action requested by a key press that the event loop must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Reload the REST snapshot
    Retry,
    ToggleBuyFeatures(bool),
    ExitPosition(String),
    /// Load candle history for a newly focused ticker
    LoadCandles(String),
    None,
}

/// Chart state for the focused ticker, dropped on focus change or reconnect.
#[derive(Debug, Clone)]
pub struct FocusedChart {
    pub ticker: String,
    record: Arc<StockRecord>,
    pub series: ChartSeries,
    pub sync: TimeScaleSync,
}

impl FocusedChart {
    fn new(ticker: String, record: Arc<StockRecord>) -> Self {
        let series = ChartSeries::from_record(&record);
        let mut sync = TimeScaleSync::new(MIN_VISIBLE_SECONDS);
        sync.fit(&series);
        Self {
            ticker,
            record,
            series,
            sync,
        }
    }

    /// Recompute the series if the record changed; the visible range is kept.
    fn update(&mut self, record: Arc<StockRecord>) {
        if Arc::ptr_eq(&self.record, &record) {
            return;
        }
        self.series = ChartSeries::from_record(&record);
        self.record = record;
        self.sync.fit(&self.series);
    }
}

#[derive(Debug)]
pub struct App {
    selection_config: SelectionConfig,
    pub snapshot: StoreSnapshot,
    pub selection: Selection,
    focus: usize,
    pub chart: Option<FocusedChart>,
    pub status: ConnectionStatus,
    pub buy_features: Option<bool>,
    /// Last REST failure, shown until the next successful load
    pub last_error: Option<ClientError>,
    pub notice: Option<String>,
}

impl App {
    pub fn new(selection_config: SelectionConfig) -> Self {
        Self {
            selection_config,
            snapshot: StoreSnapshot::default(),
            selection: Selection::default(),
            focus: 0,
            chart: None,
            status: ConnectionStatus::Disconnected,
            buy_features: None,
            last_error: None,
            notice: None,
        }
    }

    /// Take a new store snapshot, recomputing the selection when the store changed.
    ///
    /// Returns a command to load candles when focus lands on a ticker without any.
    pub fn refresh(&mut self, snapshot: StoreSnapshot) -> Command {
        if snapshot.version == self.snapshot.version && !self.selection.is_empty() {
            return Command::None;
        }

        let focused = self.focused_ticker().map(str::to_string);
        self.selection = select(snapshot.records(), &self.selection_config);
        self.snapshot = snapshot;

        // Keep focus on the same ticker when it survives the reselection
        self.focus = focused
            .and_then(|ticker| self.selection.position(&ticker))
            .unwrap_or_else(|| self.focus.min(self.selection.len().saturating_sub(1)));

        self.sync_chart()
    }

    pub fn focused_ticker(&self) -> Option<&str> {
        self.selection.get_index(self.focus).map(|(ticker, _)| ticker)
    }

    pub fn focused_record(&self) -> Option<&StockRecord> {
        self.focused_ticker().and_then(|ticker| self.snapshot.get(ticker))
    }

    pub fn focus_index(&self) -> usize {
        self.focus
    }

    /// Drop per-session view state, eg/ after a reconnect.
    pub fn reset(&mut self) {
        self.chart = None;
        self.snapshot = StoreSnapshot::default();
        self.selection = Selection::default();
        self.focus = 0;
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Command {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
            KeyCode::Up => self.move_focus(-1),
            KeyCode::Down => self.move_focus(1),
            KeyCode::Left => self.pan(-1.0),
            KeyCode::Right => self.pan(1.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(ZOOM_STEP),
            KeyCode::Char('-') => self.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char('r') => Command::Retry,
            KeyCode::Char('b') => Command::ToggleBuyFeatures(!self.buy_features.unwrap_or(false)),
            KeyCode::Char('x') => match self.focused_ticker().map(str::to_string) {
                Some(ticker) if self.snapshot.positions.contains_key(&ticker) => {
                    Command::ExitPosition(ticker)
                }
                Some(ticker) => {
                    self.notice = Some(format!("No open position in {ticker}"));
                    Command::None
                }
                None => Command::None,
            },
            _ => Command::None,
        }
    }

    fn move_focus(&mut self, step: isize) -> Command {
        if self.selection.is_empty() {
            return Command::None;
        }
        let last = self.selection.len() - 1;
        self.focus = self.focus.saturating_add_signed(step).min(last);
        self.sync_chart()
    }

    fn pan(&mut self, direction: f64) -> Command {
        if let Some(chart) = self.chart.as_mut() {
            if let Some(range) = chart.sync.range(Pane::Price) {
                let step = ((range.width() as f64 * PAN_FRACTION).round() as i64).max(60);
                chart.sync.pan(Pane::Price, (direction * step as f64) as i64);
            }
        }
        Command::None
    }

    fn zoom(&mut self, factor: f64) -> Command {
        if let Some(chart) = self.chart.as_mut() {
            chart.sync.zoom(Pane::Price, factor);
        }
        Command::None
    }

    /// Create, update or drop the focused chart to match the current focus.
    fn sync_chart(&mut self) -> Command {
        let focused = self
            .focused_ticker()
            .and_then(|ticker| Some((ticker.to_string(), self.snapshot.records.get(ticker)?.clone())));

        let Some((ticker, record)) = focused else {
            self.chart = None;
            return Command::None;
        };

        match self.chart.as_mut() {
            Some(chart) if chart.ticker == ticker => {
                chart.update(record);
                Command::None
            }
            _ => {
                let needs_candles = record.candles.as_ref().is_none_or(Vec::is_empty);
                self.chart = Some(FocusedChart::new(ticker.clone(), record));
                if needs_candles {
                    Command::LoadCandles(ticker)
                } else {
                    Command::None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use momentum_core::{Candle, PushEvent, StockStore, VisibleRange};
    use serde_json::json;

    fn store_with_tickers() -> StockStore {
        let mut store = StockStore::new();
        for (ticker, score) in [("AAA", 0.9), ("BBB", 0.8), ("CCC", 0.7)] {
            store
                .apply_event(
                    "stock_update",
                    json!({"ticker": ticker, "mode": ["five_minute_gainer"], "scores": {"technical_score": score}}),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_refresh_selects_and_requests_candles() {
        let store = store_with_tickers();
        let mut app = App::new(SelectionConfig::default());

        let command = app.refresh(store.snapshot());
        assert_eq!(app.selection.len(), 3);
        assert_eq!(app.focused_ticker(), Some("AAA"));
        assert_eq!(command, Command::LoadCandles("AAA".to_string()));

        // Same version is a no-op
        assert_eq!(app.refresh(store.snapshot()), Command::None);
    }

    #[test]
    fn test_focus_follows_ticker_and_drops_chart() {
        let mut store = store_with_tickers();
        let mut app = App::new(SelectionConfig::default());
        app.refresh(store.snapshot());

        assert_eq!(app.handle_key(KeyCode::Down), Command::LoadCandles("BBB".to_string()));
        assert_eq!(app.chart.as_ref().map(|c| c.ticker.as_str()), Some("BBB"));
        assert_eq!(app.handle_key(KeyCode::Down), Command::LoadCandles("CCC".to_string()));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.focused_ticker(), Some("CCC"));

        // CCC moves to the top but stays focused
        store
            .apply_event("scores", json!({"ticker": "CCC", "scores": {"technical_score": 0.99}}))
            .unwrap();
        app.refresh(store.snapshot());
        assert_eq!(app.focus_index(), 0);
        assert_eq!(app.focused_ticker(), Some("CCC"));

        app.reset();
        assert!(app.chart.is_none());
        assert_eq!(app.focused_ticker(), None);
    }

    #[test]
    fn test_pan_and_zoom_move_all_panes() {
        let mut store = store_with_tickers();
        let candles = (0..60)
            .map(|i| Candle::new(i * 60, 1.0, 1.1, 0.9, 1.0, 10.0))
            .collect::<Vec<_>>();
        store.apply(PushEvent::CandleHistory {
            ticker: "AAA".to_string(),
            candles,
        });

        let mut app = App::new(SelectionConfig::default());
        assert_eq!(app.refresh(store.snapshot()), Command::None);

        let sync = &app.chart.as_ref().unwrap().sync;
        assert_eq!(sync.range(Pane::Rsi), Some(VisibleRange::new(0, 3540)));

        app.handle_key(KeyCode::Right);
        let sync = &app.chart.as_ref().unwrap().sync;
        assert_eq!(sync.range(Pane::Macd), Some(VisibleRange::new(354, 3894)));
        assert_eq!(sync.range(Pane::Price), sync.range(Pane::Rsi));

        app.handle_key(KeyCode::Char('+'));
        let sync = &app.chart.as_ref().unwrap().sync;
        assert_eq!(sync.range(Pane::Macd).map(|r| r.width()), Some(2832));
        assert_eq!(sync.range(Pane::Price), sync.range(Pane::Rsi));
    }

    #[test]
    fn test_action_keys() {
        let mut store = store_with_tickers();
        let mut app = App::new(SelectionConfig::default());
        app.refresh(store.snapshot());

        assert_eq!(app.handle_key(KeyCode::Char('q')), Command::Quit);
        assert_eq!(app.handle_key(KeyCode::Char('r')), Command::Retry);
        assert_eq!(app.handle_key(KeyCode::Char('b')), Command::ToggleBuyFeatures(true));

        // No position, no exit
        assert_eq!(app.handle_key(KeyCode::Char('x')), Command::None);
        assert!(app.notice.is_some());

        store
            .apply_event("positions_update_1", json!({"AAA": {"qty": 10}}))
            .unwrap();
        app.refresh(store.snapshot());
        assert_eq!(
            app.handle_key(KeyCode::Char('x')),
            Command::ExitPosition("AAA".to_string())
        );
    }
}
