use super::Indicator;
use crate::types::Candle;

/// Volume-Weighted Average Price (VWAP) calculator
///
/// VWAP = Σ(Typical Price × Volume) / Σ(Volume), cumulative from the first candle fed (no
/// session reset). While cumulative volume is zero the previous value is carried forward, or 0
/// if there is none yet.
#[derive(Debug, Clone, Default)]
pub struct Vwap {
    cumulative_pv: f64,
    cumulative_volume: f64,
    last: Option<f64>,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indicator for Vwap {
    type Input = Candle;
    type Output = f64;

    fn update(&mut self, candle: Candle) -> Option<f64> {
        self.cumulative_pv += candle.typical_price() * candle.volume;
        self.cumulative_volume += candle.volume;

        let value = if self.cumulative_volume > 0.0 {
            self.cumulative_pv / self.cumulative_volume
        } else {
            self.last.unwrap_or(0.0)
        };

        self.last = Some(value);
        self.last
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// VWAP for every candle; always defined.
pub fn vwap(candles: &[Candle]) -> Vec<f64> {
    let mut indicator = Vwap::new();
    candles
        .iter()
        .map(|candle| indicator.update(*candle).unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle::new(0, close, high, low, close, volume)
    }

    #[test]
    fn test_vwap_is_cumulative() {
        let candles = vec![candle(10.0, 8.0, 9.0, 100.0), candle(12.0, 10.0, 11.0, 50.0)];
        let series = vwap(&candles);

        assert_eq!(series[0], 9.0);
        assert!((series[1] - (9.0 * 100.0 + 11.0 * 50.0) / 150.0).abs() < 1e-9);

        // Prefix recomputation matches cumulative value
        assert_eq!(vwap(&candles[..1])[0], series[0]);
    }

    #[test]
    fn test_vwap_zero_volume() {
        let candles = vec![
            candle(10.0, 8.0, 9.0, 0.0),
            candle(12.0, 10.0, 11.0, 10.0),
            candle(20.0, 20.0, 20.0, 0.0),
        ];
        let series = vwap(&candles);

        // No volume yet emits 0, later zero-volume candles leave the value unchanged
        assert_eq!(series, vec![0.0, 11.0, 11.0]);
        assert!(series.iter().all(|v| v.is_finite()));
    }
}
