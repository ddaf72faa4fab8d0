use super::{Indicator, compute};
use std::collections::VecDeque;

/// Simple Moving Average over a trailing window.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
        }
    }

    /// Values currently in the trailing window, oldest first.
    pub fn window(&self) -> &VecDeque<f64> {
        &self.window
    }

    pub fn is_ready(&self) -> bool {
        self.period > 0 && self.window.len() == self.period
    }
}

impl Indicator for Sma {
    type Input = f64;
    type Output = f64;

    fn update(&mut self, input: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        self.window.push_back(input);
        self.sum += input;
        if self.window.len() > self.period {
            if let Some(expired) = self.window.pop_front() {
                self.sum -= expired;
            }
        }

        self.is_ready().then(|| self.sum / self.period as f64)
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = 0.0;
    }
}

/// SMA over a full series; entries before index `period - 1` are `None`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    compute(Sma::new(period), values.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let series = sma(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(series, vec![None, None, Some(4.0), Some(6.0)]);
    }

    #[test]
    fn test_sma_short_series_is_all_none() {
        let series = sma(&[2.0, 4.0], 3);
        assert_eq!(series, vec![None, None]);
    }
}
