//! Single store writer: push channel items and REST results applied in arrival order.

use crate::socket::ChannelEvent;
use momentum_core::{PushEvent, StockRecord, StockStore};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::debug;

/// Input to the store writer.
///
/// REST results carry the push session generation current when the request was made.
#[derive(Debug)]
pub enum StoreInput {
    Channel(ChannelEvent),
    Snapshot {
        generation: u64,
        records: Vec<StockRecord>,
    },
    Event {
        generation: u64,
        event: PushEvent,
    },
}

/// What applying one [`StoreInput`] did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Store cleared for a new push session
    Reset,
    Loaded(usize),
    Applied,
    /// REST result from an earlier session, dropped
    Stale,
}

/// Push session generation shared by the writer and the REST request spawners.
#[derive(Debug, Clone, Default)]
pub struct Session(Arc<AtomicU64>);

impl Session {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Apply one input. Only the writer task calls this, so the session only advances here.
pub fn apply_input(store: &mut StockStore, session: &Session, input: StoreInput) -> WriteOutcome {
    match input {
        StoreInput::Channel(ChannelEvent::Reset) => {
            store.clear();
            let generation = session.advance();
            debug!("Push session generation {}", generation);
            WriteOutcome::Reset
        }
        StoreInput::Channel(ChannelEvent::Push(event)) => {
            store.apply(event);
            WriteOutcome::Applied
        }
        StoreInput::Snapshot { generation, records } => {
            if generation != session.current() {
                debug!("Dropping snapshot from session generation {}", generation);
                return WriteOutcome::Stale;
            }
            WriteOutcome::Loaded(store.apply_snapshot(records))
        }
        StoreInput::Event { generation, event } => {
            if generation != session.current() {
                debug!("Dropping {} from session generation {}", event.kind(), generation);
                return WriteOutcome::Stale;
            }
            store.apply(event);
            WriteOutcome::Applied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(ticker: &str) -> StockRecord {
        serde_json::from_value(json!({"ticker": ticker})).unwrap()
    }

    fn positions(ticker: &str) -> PushEvent {
        PushEvent::positions(json!({ ticker: {"qty": 1} })).unwrap()
    }

    #[test]
    fn test_apply_input_drops_results_from_earlier_sessions() {
        struct TestCase {
            input: StoreInput,
            expected: WriteOutcome,
            expected_generation: u64,
            expected_tickers: Vec<&'static str>,
            expected_positions: Vec<&'static str>,
        }

        let tests = vec![
            TestCase {
                // TC0: snapshot of the current session
                input: StoreInput::Snapshot {
                    generation: 0,
                    records: vec![record("AAA")],
                },
                expected: WriteOutcome::Loaded(1),
                expected_generation: 0,
                expected_tickers: vec!["AAA"],
                expected_positions: vec![],
            },
            TestCase {
                // TC1: new push session clears the store
                input: StoreInput::Channel(ChannelEvent::Reset),
                expected: WriteOutcome::Reset,
                expected_generation: 1,
                expected_tickers: vec![],
                expected_positions: vec![],
            },
            TestCase {
                // TC2: snapshot requested before the reset
                input: StoreInput::Snapshot {
                    generation: 0,
                    records: vec![record("OLD")],
                },
                expected: WriteOutcome::Stale,
                expected_generation: 1,
                expected_tickers: vec![],
                expected_positions: vec![],
            },
            TestCase {
                // TC3: positions requested before the reset
                input: StoreInput::Event {
                    generation: 0,
                    event: positions("OLD"),
                },
                expected: WriteOutcome::Stale,
                expected_generation: 1,
                expected_tickers: vec![],
                expected_positions: vec![],
            },
            TestCase {
                // TC4: positions of the current session
                input: StoreInput::Event {
                    generation: 1,
                    event: positions("BBB"),
                },
                expected: WriteOutcome::Applied,
                expected_generation: 1,
                expected_tickers: vec![],
                expected_positions: vec!["BBB"],
            },
            TestCase {
                // TC5: push events carry no generation and always apply
                input: StoreInput::Channel(ChannelEvent::Push(PushEvent::StockUpdate(record("CCC")))),
                expected: WriteOutcome::Applied,
                expected_generation: 1,
                expected_tickers: vec!["CCC"],
                expected_positions: vec!["BBB"],
            },
        ];

        let mut store = StockStore::new();
        let session = Session::default();

        for (index, test) in tests.into_iter().enumerate() {
            let version = store.version();
            let actual = apply_input(&mut store, &session, test.input);
            assert_eq!(actual, test.expected, "TC{} failed", index);
            assert_eq!(session.current(), test.expected_generation, "TC{} failed", index);

            let snapshot = store.snapshot();
            let tickers = snapshot.records.keys().map(String::as_str).collect::<Vec<_>>();
            let positions = snapshot.positions.keys().map(String::as_str).collect::<Vec<_>>();
            assert_eq!(tickers, test.expected_tickers, "TC{} failed", index);
            assert_eq!(positions, test.expected_positions, "TC{} failed", index);

            if actual == WriteOutcome::Stale {
                assert_eq!(store.version(), version, "TC{} failed", index);
            }
        }
    }

    #[test]
    fn test_session_is_shared_between_clones() {
        let session = Session::default();
        let spawner = session.clone();

        let mut store = StockStore::new();
        apply_input(&mut store, &session, StoreInput::Channel(ChannelEvent::Reset));
        apply_input(&mut store, &session, StoreInput::Channel(ChannelEvent::Reset));

        assert_eq!(spawner.current(), 2);
    }
}
