//! Display selection.
//!
//! Picks the bounded, ordered, de-duplicated set of tickers to show from six candidate
//! subsets, each tagged with the subsets that caused its inclusion.

use crate::{
    classify::{check_all_green, green_indicator_count},
    types::{StockRecord, keys, modes},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

/// Caps applied when merging the candidate subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Maximum number of first-time insertions from the capped subsets
    pub max_tickers: usize,
    /// Number of top session gainers appended regardless of the cap
    pub session_gainers: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_tickers: 20,
            session_gainers: 3,
        }
    }
}

/// Reason a ticker was selected.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum SelectionTag {
    #[serde(rename = "all_green")]
    AllGreen,
    #[serde(rename = "rapid_5green")]
    RapidFiveGreen,
    #[serde(rename = "top_5m")]
    TopFiveMinute,
    #[serde(rename = "session_gainer")]
    SessionGainer,
    #[serde(rename = "rapid")]
    Rapid,
    #[serde(rename = "vwap_candidate")]
    VwapCandidate,
}

impl SelectionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionTag::AllGreen => "all_green",
            SelectionTag::RapidFiveGreen => "rapid_5green",
            SelectionTag::TopFiveMinute => "top_5m",
            SelectionTag::SessionGainer => "session_gainer",
            SelectionTag::Rapid => "rapid",
            SelectionTag::VwapCandidate => "vwap_candidate",
        }
    }
}

impl Display for SelectionTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered selection of tickers with their accumulated tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection(IndexMap<String, Vec<SelectionTag>>);

impl Selection {
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn tags(&self, ticker: &str) -> Option<&[SelectionTag]> {
        self.0.get(ticker).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SelectionTag])> {
        self.0
            .iter()
            .map(|(ticker, tags)| (ticker.as_str(), tags.as_slice()))
    }

    pub fn get_index(&self, index: usize) -> Option<(&str, &[SelectionTag])> {
        self.0
            .get_index(index)
            .map(|(ticker, tags)| (ticker.as_str(), tags.as_slice()))
    }

    pub fn position(&self, ticker: &str) -> Option<usize> {
        self.0.get_index_of(ticker)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add a tag to a ticker already selected. Returns false if the ticker is not present.
    fn retag(&mut self, ticker: &str, tag: SelectionTag) -> bool {
        match self.0.get_mut(ticker) {
            Some(tags) => {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
                true
            }
            None => false,
        }
    }

    /// Append a subset; new tickers are only inserted while the selection is below `cap`.
    fn extend_capped(&mut self, subset: &[&StockRecord], tag: SelectionTag, cap: usize) {
        for record in subset {
            if !self.retag(&record.ticker, tag) && self.0.len() < cap {
                self.0.insert(record.ticker.clone(), vec![tag]);
            }
        }
    }

    fn extend_uncapped(&mut self, subset: &[&StockRecord], tag: SelectionTag) {
        self.extend_capped(subset, tag, usize::MAX);
    }
}

fn technical_score(record: &StockRecord) -> f64 {
    record.technical_score().unwrap_or(0.0)
}

fn by_technical_score(a: &StockRecord, b: &StockRecord) -> Ordering {
    technical_score(b).total_cmp(&technical_score(a))
}

fn by_green_count_then_score(a: &StockRecord, b: &StockRecord) -> Ordering {
    green_indicator_count(b)
        .cmp(&green_indicator_count(a))
        .then_with(|| by_technical_score(a, b))
}

fn filter<'a>(records: &[&'a StockRecord], predicate: fn(&StockRecord) -> bool) -> Vec<&'a StockRecord> {
    records
        .iter()
        .copied()
        .filter(|record| predicate(record))
        .collect()
}

/// Six candidate subsets, each filtered and sorted independently.
#[derive(Debug, Default)]
pub struct Candidates<'a> {
    pub vwap_candidates: Vec<&'a StockRecord>,
    pub session_gainers: Vec<&'a StockRecord>,
    pub all_green: Vec<&'a StockRecord>,
    pub rapid_5green: Vec<&'a StockRecord>,
    pub top_5m: Vec<&'a StockRecord>,
    pub rapid: Vec<&'a StockRecord>,
}

impl<'a> Candidates<'a> {
    pub fn build<I>(records: I, config: &SelectionConfig) -> Self
    where
        I: IntoIterator<Item = &'a StockRecord>,
    {
        let records = records.into_iter().collect::<Vec<_>>();
        let filtered = |predicate: fn(&StockRecord) -> bool| filter(&records, predicate);

        let vwap_candidates = filtered(|record| {
            record.has_mode(modes::VWAP_CANDIDATE)
                && matches!(
                    (record.indicator(keys::EMA5), record.indicator(keys::VWAP)),
                    (Some(ema5), Some(vwap)) if ema5 < vwap
                )
        });

        let mut session_gainers = filtered(|record| {
            record.has_mode(modes::SESSION_GAINER) && record.percent_change().is_some()
        });
        session_gainers.sort_by(|a, b| {
            let change = |record: &StockRecord| record.percent_change().unwrap_or(0.0);
            change(*b).total_cmp(&change(*a))
        });
        session_gainers.truncate(config.session_gainers);

        let mut all_green = filtered(check_all_green);
        all_green.sort_by(|a, b| by_green_count_then_score(a, b));

        let mut rapid_5green = filtered(|record| {
            record.has_mode(modes::RAPID_GAINER) && green_indicator_count(record) >= 5
        });
        rapid_5green.sort_by(|a, b| by_green_count_then_score(a, b));

        let mut top_5m = filtered(|record| record.has_mode(modes::FIVE_MINUTE_GAINER));
        top_5m.sort_by(|a, b| by_technical_score(a, b));

        let mut rapid = filtered(|record| record.has_mode(modes::RAPID_GAINER));
        rapid.sort_by(|a, b| by_technical_score(a, b));

        Self {
            vwap_candidates,
            session_gainers,
            all_green,
            rapid_5green,
            top_5m,
            rapid,
        }
    }
}

/// Select the tickers to display.
///
/// Priority: all_green, rapid_5green, top_5m (capped), then every session gainer (uncapped),
/// then rapid and vwap_candidates (capped). A ticker already selected only gains a tag.
pub fn select<'a, I>(records: I, config: &SelectionConfig) -> Selection
where
    I: IntoIterator<Item = &'a StockRecord>,
{
    let candidates = Candidates::build(records, config);
    let cap = config.max_tickers;
    let mut selection = Selection::default();

    selection.extend_capped(&candidates.all_green, SelectionTag::AllGreen, cap);
    selection.extend_capped(&candidates.rapid_5green, SelectionTag::RapidFiveGreen, cap);
    selection.extend_capped(&candidates.top_5m, SelectionTag::TopFiveMinute, cap);
    selection.extend_uncapped(&candidates.session_gainers, SelectionTag::SessionGainer);
    selection.extend_capped(&candidates.rapid, SelectionTag::Rapid, cap);
    selection.extend_capped(&candidates.vwap_candidates, SelectionTag::VwapCandidate, cap);

    selection
}
