use super::{Indicator, compute};

/// Exponential Moving Average (EMA) calculator
///
/// Seeded with the simple average of the first `period` values, then smoothed with
/// `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    /// EMA period
    period: usize,
    /// Smoothing factor (alpha)
    alpha: f64,
    /// Current EMA value
    value: Option<f64>,
    /// Sum of the seed window
    seed_sum: f64,
    /// Number of data points processed
    count: usize,
}

impl Ema {
    /// Create a new EMA calculator
    pub fn new(period: usize) -> Self {
        let alpha = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            alpha,
            value: None,
            seed_sum: 0.0,
            count: 0,
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Check if EMA has enough data points
    pub fn is_ready(&self) -> bool {
        self.period > 0 && self.count >= self.period
    }
}

impl Indicator for Ema {
    type Input = f64;
    type Output = f64;

    fn update(&mut self, input: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.count += 1;

        self.value = match self.value {
            Some(current) => Some((input - current) * self.alpha + current),
            None => {
                self.seed_sum += input;
                (self.count == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };

        self.value
    }

    fn reset(&mut self) {
        self.value = None;
        self.seed_sum = 0.0;
        self.count = 0;
    }
}

/// EMA over a full series; the first `period - 1` entries are `None`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    compute(Ema::new(period), values.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema() {
        let mut ema = Ema::new(3);

        assert_eq!(ema.update(100.0), None);
        assert_eq!(ema.update(102.0), None);
        assert!(!ema.is_ready());

        // Seed is the simple average of the first 3
        assert_eq!(ema.update(104.0), Some(102.0));
        assert!(ema.is_ready());

        // alpha = 2 / (3 + 1) = 0.5
        // (106 - 102) * 0.5 + 102 = 104
        assert_eq!(ema.update(106.0), Some(104.0));

        ema.reset();
        assert_eq!(ema.value(), None);
        assert!(!ema.is_ready());
    }

    #[test]
    fn test_ema_series_is_aligned() {
        let series = ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(series, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);

        assert_eq!(ema(&[1.0], 5), vec![None]);
        assert!(ema(&[], 5).is_empty());
        assert_eq!(ema(&[1.0, 2.0], 0), vec![None, None]);
    }
}
