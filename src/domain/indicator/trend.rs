//! Trend slope: ordinary-least-squares slope of an indicator's last w
//! values against the index 0..w-1. Used to tell whether a moving average
//! is rising (> 0) or falling (< 0).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

/// OLS slope of `values` against 0..len. `None` for fewer than two values.
pub fn ols_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    Some(num / den)
}

/// Slope over the last `window` entries of `source`; undefined unless all
/// of them are defined.
pub fn slope(source: &[Option<f64>], window: usize) -> Option<f64> {
    if window < 2 || source.len() < window {
        return None;
    }
    let tail: Option<Vec<f64>> = source[source.len() - window..].iter().copied().collect();
    ols_slope(&tail?)
}

pub fn calculate_slope(source: &IndicatorSeries, window: usize) -> IndicatorSeries {
    let mut series = IndicatorSeries::with_capacity(
        IndicatorType::slope_of(source.indicator_type.clone(), window),
        source.len(),
    );
    for i in 0..source.len() {
        series.push(slope(&source.values[..=i], window));
    }
    series
}
