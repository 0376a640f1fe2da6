//! Rolling volatility.
//!
//! Sample standard deviation of the last n returns:
//! VOL(n) = sqrt(sum((r - mean)^2) / (n - 1))
//! Warmup: first (n-1) returns are undefined. Requires n >= 2.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn sample_stddev(values: &[f64], period: usize) -> Option<f64> {
    if period < 2 || values.len() < period {
        return None;
    }

    let window = &values[values.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (period - 1) as f64;

    Some(variance.sqrt())
}

/// Series aligned with `returns` (one entry per return, not per price).
pub fn calculate_volatility(returns: &[f64], period: usize) -> IndicatorSeries {
    let mut series =
        IndicatorSeries::with_capacity(IndicatorType::Volatility(period), returns.len());
    for i in 0..returns.len() {
        series.push(sample_stddev(&returns[..=i], period));
    }
    series
}
