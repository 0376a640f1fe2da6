//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Undefined until n prices exist.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

/// Mean of the last `period` values, or `None` when fewer are available.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

pub fn calculate_sma(prices: &[f64], period: usize) -> IndicatorSeries {
    let mut series = IndicatorSeries::with_capacity(IndicatorType::Sma(period), prices.len());
    for i in 0..prices.len() {
        series.push(sma(&prices[..=i], period));
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_warmup() {
        let series = calculate_sma(&[10.0, 20.0, 30.0, 40.0], 3);
        assert_eq!(series.values[0], None);
        assert_eq!(series.values[1], None);
        assert!(series.values[2].is_some());
        assert!(series.values[3].is_some());
    }

    #[test]
    fn sma_uses_trailing_window() {
        let series = calculate_sma(&[10.0, 20.0, 30.0, 40.0], 3);
        assert_relative_eq!(series.values[2].unwrap(), 20.0);
        assert_relative_eq!(series.values[3].unwrap(), 30.0);
    }

    #[test]
    fn sma_flat_then_jump() {
        let series = calculate_sma(&[10.0, 10.0, 10.0, 10.0, 10.0, 20.0], 5);
        for i in 0..4 {
            assert_eq!(series.values[i], None, "step {} should be undefined", i);
        }
        assert_relative_eq!(series.values[4].unwrap(), 10.0);
        assert_relative_eq!(series.values[5].unwrap(), 12.0);
    }

    #[test]
    fn sma_period_0() {
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn sma_indicator_type() {
        let series = calculate_sma(&[1.0], 7);
        assert_eq!(series.indicator_type, IndicatorType::Sma(7));
    }
}
