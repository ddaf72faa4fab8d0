//! Chart adapter.
//!
//! Turns a ticker record into the gap-free time/value series a chart surface consumes, and
//! keeps the visible time range of the linked price, MACD and RSI panes in lockstep.

use crate::{
    indicators::{self, MacdConfig, zero_filled},
    types::{Candle, StockRecord},
};
use serde::{Deserialize, Serialize};

/// Period of the long trend EMA drawn on the price pane
pub const TREND_EMA_PERIOD: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ChartPoint {
    pub time: i64,
    pub value: f64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarColor {
    Green,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct HistogramPoint {
    pub time: i64,
    pub value: f64,
    pub color: BarColor,
}

/// Every series drawn for one ticker, aligned on the sorted candle times.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChartSeries {
    pub candles: Vec<Candle>,
    /// Green if close >= open, else red
    pub volume: Vec<HistogramPoint>,
    pub macd: Vec<ChartPoint>,
    pub macd_signal: Vec<ChartPoint>,
    /// Green when non-negative
    pub macd_histogram: Vec<HistogramPoint>,
    pub vwap: Vec<ChartPoint>,
    pub ema200: Vec<ChartPoint>,
    pub rsi: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn from_record(record: &StockRecord) -> Self {
        Self::from_candles(record.sorted_candles())
    }

    /// Build all series from candles already sorted by time.
    pub fn from_candles(candles: Vec<Candle>) -> Self {
        let closes = candles.iter().map(|c| c.close).collect::<Vec<_>>();
        let times = candles.iter().map(|c| c.time).collect::<Vec<_>>();

        let macd = indicators::macd(&closes, MacdConfig::default());
        let vwap = indicators::vwap(&candles);
        let ema200 = indicators::ema(&closes, TREND_EMA_PERIOD);
        let rsi = indicators::rsi(&closes, indicators::rsi::DEFAULT_PERIOD);

        let volume = candles
            .iter()
            .map(|candle| HistogramPoint {
                time: candle.time,
                value: candle.volume,
                color: if candle.is_bullish() {
                    BarColor::Green
                } else {
                    BarColor::Red
                },
            })
            .collect();

        let macd_histogram = times
            .iter()
            .zip(zero_filled(&macd.histogram))
            .map(|(time, value)| HistogramPoint {
                time: *time,
                value,
                color: if value >= 0.0 {
                    BarColor::Green
                } else {
                    BarColor::Red
                },
            })
            .collect();

        Self {
            volume,
            macd: points(&times, &zero_filled(&macd.macd)),
            macd_signal: points(&times, &zero_filled(&macd.signal)),
            macd_histogram,
            vwap: points(&times, &vwap),
            ema200: points(&times, &zero_filled(&ema200)),
            rsi: points(&times, &zero_filled(&rsi)),
            candles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// First and last candle time.
    pub fn time_bounds(&self) -> Option<VisibleRange> {
        Some(VisibleRange {
            from: self.candles.first()?.time,
            to: self.candles.last()?.time,
        })
    }
}

fn points(times: &[i64], values: &[f64]) -> Vec<ChartPoint> {
    times
        .iter()
        .zip(values)
        .map(|(time, value)| ChartPoint {
            time: *time,
            value: *value,
        })
        .collect()
}

/// Inclusive visible time range, epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct VisibleRange {
    pub from: i64,
    pub to: i64,
}

impl VisibleRange {
    pub fn new(from: i64, to: i64) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    pub fn width(&self) -> i64 {
        self.to - self.from
    }

    pub fn contains(&self, time: i64) -> bool {
        (self.from..=self.to).contains(&time)
    }

    fn shifted(&self, delta: i64) -> Self {
        Self {
            from: self.from.saturating_add(delta),
            to: self.to.saturating_add(delta),
        }
    }

    /// Scale the width around the centre; `factor > 1` zooms in.
    fn scaled(&self, factor: f64, min_width: i64) -> Self {
        let centre = self.from + self.width() / 2;
        let width = ((self.width() as f64 / factor).round() as i64).max(min_width);
        Self {
            from: centre - width / 2,
            to: centre - width / 2 + width,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum Pane {
    Price,
    Macd,
    Rsi,
}

impl Pane {
    pub const ALL: [Pane; 3] = [Pane::Price, Pane::Macd, Pane::Rsi];

    fn index(self) -> usize {
        match self {
            Pane::Price => 0,
            Pane::Macd => 1,
            Pane::Rsi => 2,
        }
    }
}

/// Keeps the time axes of the linked panes identical.
///
/// A range change on any pane is propagated to the other two. Created when a ticker is focused
/// and dropped with it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeScaleSync {
    ranges: [Option<VisibleRange>; 3],
    min_width: i64,
}

impl Default for TimeScaleSync {
    fn default() -> Self {
        Self {
            ranges: [None; 3],
            min_width: 60,
        }
    }
}

impl TimeScaleSync {
    pub fn new(min_width: i64) -> Self {
        Self {
            min_width: min_width.max(1),
            ..Self::default()
        }
    }

    pub fn range(&self, pane: Pane) -> Option<VisibleRange> {
        self.ranges[pane.index()]
    }

    /// Set the range of `source` and mirror it onto the other panes. Returns the panes that
    /// changed as a result.
    pub fn set_range(&mut self, source: Pane, range: VisibleRange) -> Vec<Pane> {
        Pane::ALL
            .into_iter()
            .filter(|pane| {
                let slot = &mut self.ranges[pane.index()];
                let changed = *slot != Some(range);
                *slot = Some(range);
                changed && *pane != source
            })
            .collect()
    }

    /// Show the whole series on every pane if nothing is visible yet.
    pub fn fit(&mut self, series: &ChartSeries) {
        if self.ranges.iter().all(Option::is_none) {
            if let Some(bounds) = series.time_bounds() {
                self.set_range(Pane::Price, bounds);
            }
        }
    }

    pub fn pan(&mut self, source: Pane, delta: i64) -> Vec<Pane> {
        match self.range(source) {
            Some(range) => self.set_range(source, range.shifted(delta)),
            None => Vec::new(),
        }
    }

    pub fn zoom(&mut self, source: Pane, factor: f64) -> Vec<Pane> {
        if !(factor.is_finite() && factor > 0.0) {
            return Vec::new();
        }
        match self.range(source) {
            Some(range) => {
                let scaled = range.scaled(factor, self.min_width);
                self.set_range(source, scaled)
            }
            None => Vec::new(),
        }
    }

    /// Forget all ranges, eg/ on focus change or reconnect.
    pub fn reset(&mut self) {
        self.ranges = [None; 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(count: i64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let close = 10.0 + i as f64 * 0.1;
                let open = if i % 2 == 0 { close - 0.05 } else { close + 0.05 };
                Candle::new(i * 60, open, close + 0.1, close - 0.1, close, 100.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn test_series_are_aligned_and_gap_free() {
        let series = ChartSeries::from_candles(candles(40));

        assert_eq!(series.volume.len(), 40);
        assert_eq!(series.macd.len(), 40);
        assert_eq!(series.macd_signal.len(), 40);
        assert_eq!(series.macd_histogram.len(), 40);
        assert_eq!(series.vwap.len(), 40);
        assert_eq!(series.ema200.len(), 40);
        assert_eq!(series.rsi.len(), 40);

        // EMA200 never warms on 40 candles and is zero filled
        assert!(series.ema200.iter().all(|p| p.value == 0.0));
        assert!(series.rsi.iter().all(|p| p.value.is_finite()));
        assert_eq!(series.rsi[13].value, 0.0);
        assert!(series.rsi[14].value > 0.0);

        assert_eq!(series.volume[0].color, BarColor::Green);
        assert_eq!(series.volume[1].color, BarColor::Red);
        assert_eq!(series.macd[39].time, 39 * 60);
    }

    #[test]
    fn test_from_record_sorts_candles() {
        let mut record = StockRecord::new("AAA");
        for candle in candles(5).into_iter().rev() {
            record.upsert_candle(candle);
        }

        let series = ChartSeries::from_record(&record);
        let times = series.candles.iter().map(|c| c.time).collect::<Vec<_>>();
        assert_eq!(times, vec![0, 60, 120, 180, 240]);
        assert_eq!(series.time_bounds(), Some(VisibleRange::new(0, 240)));
    }

    #[test]
    fn test_time_scale_sync() {
        let mut sync = TimeScaleSync::new(60);
        sync.fit(&ChartSeries::from_candles(candles(11)));

        for pane in Pane::ALL {
            assert_eq!(sync.range(pane), Some(VisibleRange::new(0, 600)));
        }

        // Panning one pane moves the other two identically
        let changed = sync.pan(Pane::Macd, 120);
        assert_eq!(changed, vec![Pane::Price, Pane::Rsi]);
        for pane in Pane::ALL {
            assert_eq!(sync.range(pane), Some(VisibleRange::new(120, 720)));
        }

        sync.zoom(Pane::Rsi, 2.0);
        for pane in Pane::ALL {
            assert_eq!(sync.range(pane), Some(VisibleRange::new(270, 570)));
        }

        // Zoom never goes below the minimum width
        sync.zoom(Pane::Price, 1_000.0);
        assert_eq!(sync.range(Pane::Macd).map(|r| r.width()), Some(60));

        sync.reset();
        assert_eq!(sync.range(Pane::Price), None);
        assert!(sync.pan(Pane::Price, 60).is_empty());
    }
}
