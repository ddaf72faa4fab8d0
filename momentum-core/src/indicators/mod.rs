/// Technical indicator engine
///
/// Every indicator is a streaming accumulator fed one input at a time. The free functions
/// (`ema`, `sma`, `bollinger_bands`, `macd`, `rsi`, `vwap`) run a fresh accumulator over a
/// whole series and return one output per input, so callers can recompute from scratch on
/// every change. Warm-up entries are `None` except where an indicator documents otherwise.
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod vwap;

pub use bollinger::{Bollinger, BollingerBands, bollinger_bands};
pub use ema::{Ema, ema};
pub use macd::{Macd, MacdConfig, MacdSeries, MacdValue, macd};
pub use rsi::{Rsi, rsi};
pub use sma::{Sma, sma};
pub use vwap::{Vwap, vwap};

/// Stateful indicator fed one input at a time.
pub trait Indicator {
    type Input;
    type Output;

    /// Consume the next input, returning the output once warm-up is satisfied.
    fn update(&mut self, input: Self::Input) -> Option<Self::Output>;

    /// Drop all accumulated state.
    fn reset(&mut self);
}

/// Run an indicator over a full series, one output per input.
pub fn compute<I, T>(mut indicator: I, inputs: T) -> Vec<Option<I::Output>>
where
    I: Indicator,
    T: IntoIterator<Item = I::Input>,
{
    inputs
        .into_iter()
        .map(|input| indicator.update(input))
        .collect()
}

/// Replace warm-up gaps with 0, for consumers that cannot render gaps.
pub fn zero_filled(series: &[Option<f64>]) -> Vec<f64> {
    series
        .iter()
        .map(|value| value.filter(|v| v.is_finite()).unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_filled() {
        let series = vec![None, Some(1.5), Some(f64::NAN), Some(-2.0)];
        assert_eq!(zero_filled(&series), vec![0.0, 1.5, 0.0, -2.0]);
    }
}
