use super::{Ema, Indicator};
use serde::{Deserialize, Serialize};

/// MACD periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MacdConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// One MACD output. `signal` and `histogram` stay `None` until the signal EMA is warm.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// Streaming MACD: fast EMA minus slow EMA, with an EMA signal line over the difference.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(config: MacdConfig) -> Self {
        Self {
            fast: Ema::new(config.fast),
            slow: Ema::new(config.slow),
            signal: Ema::new(config.signal),
        }
    }
}

impl Indicator for Macd {
    type Input = f64;
    type Output = MacdValue;

    fn update(&mut self, input: f64) -> Option<MacdValue> {
        let fast = self.fast.update(input);
        let slow = self.slow.update(input);

        let macd = fast? - slow?;
        let signal = self.signal.update(macd);

        Some(MacdValue {
            macd,
            signal,
            histogram: signal.map(|signal| macd - signal),
        })
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
    }
}

/// Three MACD series aligned with the input prices.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl MacdSeries {
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    fn push(&mut self, macd: Option<f64>, signal: Option<f64>, histogram: Option<f64>) {
        self.macd.push(macd);
        self.signal.push(signal);
        self.histogram.push(histogram);
    }
}

/// MACD over a full series.
///
/// The first `slow - 1` entries of all three series are `Some(0.0)`; after that values come
/// straight from the streaming computation (`signal`/`histogram` are `None` until warm).
pub fn macd(values: &[f64], config: MacdConfig) -> MacdSeries {
    let mut indicator = Macd::new(config);
    let prefix = config.slow.saturating_sub(1);

    let mut series = MacdSeries {
        macd: Vec::with_capacity(values.len()),
        signal: Vec::with_capacity(values.len()),
        histogram: Vec::with_capacity(values.len()),
    };

    for (index, value) in values.iter().enumerate() {
        let output = indicator.update(*value);
        if index < prefix {
            series.push(Some(0.0), Some(0.0), Some(0.0));
            continue;
        }

        match output {
            Some(output) => series.push(Some(output.macd), output.signal, output.histogram),
            None => series.push(None, None, None),
        }
    }

    series
}
