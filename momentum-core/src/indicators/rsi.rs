use super::{Indicator, compute};

/// Default RSI period
pub const DEFAULT_PERIOD: usize = 14;

/// Relative Strength Index with Wilder smoothing.
///
/// Average gain/loss are seeded with the simple mean of the first `period` price changes, so
/// the first value appears at index `period`. Values are rounded to two decimals.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    previous: Option<f64>,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            previous: None,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    fn value(&self) -> f64 {
        let rsi = if self.avg_loss == 0.0 {
            100.0
        } else if self.avg_gain == 0.0 {
            0.0
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        };

        (rsi * 100.0).round() / 100.0
    }
}

impl Indicator for Rsi {
    type Input = f64;
    type Output = f64;

    fn update(&mut self, input: f64) -> Option<f64> {
        let previous = self.previous.replace(input)?;
        if self.period == 0 {
            return None;
        }

        let change = input - previous;
        let (gain, loss) = (change.max(0.0), (-change).max(0.0));
        let period = self.period as f64;
        self.changes += 1;

        if self.changes <= self.period {
            // Seed window accumulates sums, averaged once full
            self.avg_gain += gain;
            self.avg_loss += loss;
            if self.changes < self.period {
                return None;
            }
            self.avg_gain /= period;
            self.avg_loss /= period;
        } else {
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }

        Some(self.value())
    }

    fn reset(&mut self) {
        *self = Self::new(self.period);
    }
}

/// RSI over a full series; the first `period` entries are `None`.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    compute(Rsi::new(period), values.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_wilder_smoothing() {
        // changes +1, -1 seed 0.5 / 0.5 = 50
        // next +1: gain (0.5 + 1) / 2 = 0.75, loss 0.5 / 2 = 0.25, RS 3 = 75
        let series = rsi(&[1.0, 2.0, 1.0, 2.0], 2);
        assert_eq!(series, vec![None, None, Some(50.0), Some(75.0)]);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising = (0..20).map(|i| i as f64).collect::<Vec<_>>();
        let series = rsi(&rising, DEFAULT_PERIOD);
        assert_eq!(series.len(), 20);
        assert!(series[..DEFAULT_PERIOD].iter().all(Option::is_none));
        assert_eq!(series[DEFAULT_PERIOD], Some(100.0));

        let falling = rising.iter().rev().copied().collect::<Vec<_>>();
        assert_eq!(rsi(&falling, DEFAULT_PERIOD)[19], Some(0.0));
    }

    #[test]
    fn test_rsi_rounds_to_two_decimals() {
        let series = rsi(&[10.0, 11.0, 10.5, 10.0], 3);
        // gains 1, losses 1: avg 1/3 each -> 50
        assert_eq!(series[3], Some(50.0));

        let series = rsi(&[10.0, 11.0, 10.0, 10.5], 3);
        // gains 1.5, losses 1 -> RS 1.5 -> 60
        assert_eq!(series[3], Some(60.0));

        let series = rsi(&[10.0, 12.0, 11.0, 10.0, 10.7], 3);
        let value = series[4].unwrap();
        assert_eq!(value, (value * 100.0).round() / 100.0);
    }
}
