use super::{Indicator, Sma, compute};
use serde::{Deserialize, Serialize};

/// Default standard deviation multiplier
pub const DEFAULT_STD_DEV: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands built on a trailing SMA with a population standard deviation.
#[derive(Debug, Clone)]
pub struct Bollinger {
    sma: Sma,
    std_dev: f64,
}

impl Bollinger {
    pub fn new(period: usize, std_dev: f64) -> Self {
        Self {
            sma: Sma::new(period),
            std_dev,
        }
    }
}

impl Indicator for Bollinger {
    type Input = f64;
    type Output = BollingerBands;

    fn update(&mut self, input: f64) -> Option<BollingerBands> {
        let middle = self.sma.update(input)?;

        let window = self.sma.window();
        let variance = window
            .iter()
            .map(|value| (value - middle).powi(2))
            .sum::<f64>()
            / window.len() as f64;
        let deviation = self.std_dev * variance.sqrt();

        Some(BollingerBands {
            upper: middle + deviation,
            middle,
            lower: middle - deviation,
        })
    }

    fn reset(&mut self) {
        self.sma.reset();
    }
}

/// Bollinger Bands over a full series; entries before index `period - 1` are `None`.
pub fn bollinger_bands(values: &[f64], period: usize, std_dev: f64) -> Vec<Option<BollingerBands>> {
    compute(Bollinger::new(period, std_dev), values.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bollinger_bands() {
        let series = bollinger_bands(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8, DEFAULT_STD_DEV);

        assert_eq!(series.len(), 8);
        assert!(series[..7].iter().all(Option::is_none));

        // mean 5, population std dev 2
        let bands = series[7].unwrap();
        assert_eq!(bands.middle, 5.0);
        assert_eq!(bands.upper, 9.0);
        assert_eq!(bands.lower, 1.0);
    }

    #[test]
    fn test_bollinger_flat_series_has_zero_width() {
        let series = bollinger_bands(&[3.0; 4], 2, DEFAULT_STD_DEV);
        let bands = series[3].unwrap();
        assert_eq!(bands.upper, bands.lower);
        assert_eq!(bands.middle, 3.0);
    }

    #[test]
    fn test_bollinger_short_series_has_no_bands() {
        let series = bollinger_bands(&[1.0, 2.0, 3.0], 20, DEFAULT_STD_DEV);
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(Option::is_none));

        assert!(bollinger_bands(&[], 20, DEFAULT_STD_DEV).is_empty());
    }
}
