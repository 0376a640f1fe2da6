//! Stochastic oscillator (%K) over the trailing n closes.
//!
//! %K = (C - min) / (max - min) * 100. A flat window (max == min) has no
//! range to place the close in and resolves to the midpoint 50.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub const FLAT_WINDOW_VALUE: f64 = 50.0;

pub fn stochastic(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let last = *window.last()?;
    let (lowest, highest) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
            (lo.min(p), hi.max(p))
        });

    let range = highest - lowest;
    if range == 0.0 {
        return Some(FLAT_WINDOW_VALUE);
    }
    Some((last - lowest) / range * 100.0)
}

pub fn calculate_stochastic(prices: &[f64], period: usize) -> IndicatorSeries {
    let mut series =
        IndicatorSeries::with_capacity(IndicatorType::Stochastic(period), prices.len());
    for i in 0..prices.len() {
        series.push(stochastic(&prices[..=i], period));
    }
    series
}
