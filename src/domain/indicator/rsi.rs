//! RSI (Relative Strength Index) over a simple trailing window.
//!
//! gain = mean(max(d, 0)) and loss = mean(max(-d, 0)) over the last n
//! price differences d. RSI = 100 - 100 / (1 + gain / loss), and exactly
//! 100 when loss == 0 (this includes a perfectly flat window).
//!
//! Warmup: n differences need n + 1 prices, so the first n points are undefined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];
    let mut gain = 0.0;
    let mut loss = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain += change;
        } else {
            loss -= change;
        }
    }
    gain /= period as f64;
    loss /= period as f64;

    if loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - (100.0 / (1.0 + gain / loss)))
}

pub fn calculate_rsi(prices: &[f64], period: usize) -> IndicatorSeries {
    let mut series = IndicatorSeries::with_capacity(IndicatorType::Rsi(period), prices.len());
    for i in 0..prices.len() {
        series.push(rsi(&prices[..=i], period));
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rsi_empty() {
        let series = calculate_rsi(&[], 14);
        assert!(series.values.is_empty());
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&prices, 14);

        for i in 0..14 {
            assert!(series.values[i].is_none(), "point {} should be undefined", i);
        }
        assert!(series.values[14].is_some(), "point 14 should be defined");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let value = rsi(&prices, 14).unwrap();
        assert!(value.abs() < f64::EPSILON, "RSI should be 0 when all losses");
    }

    #[test]
    fn rsi_flat_window_is_exactly_100() {
        assert_eq!(rsi(&[50.0; 6], 5), Some(100.0));
    }

    #[test]
    fn rsi_only_reads_trailing_window() {
        // the early crash is outside the 3-difference window
        let prices = [100.0, 10.0, 11.0, 12.0, 13.0];
        assert_eq!(rsi(&prices, 3), Some(100.0));
    }

    #[test]
    fn rsi_known_calculation() {
        // diffs: +2, -1, +2, -1 -> gain 1.0, loss 0.5
        let prices = [10.0, 12.0, 11.0, 13.0, 12.0];
        let value = rsi(&prices, 4).unwrap();
        let expected = 100.0 - 100.0 / (1.0 + 2.0);
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&[100.0, 101.0], 0);
        assert!(series.values.iter().all(Option::is_none));
    }

    proptest! {
        #[test]
        fn rsi_stays_in_range(prices in prop::collection::vec(1.0f64..1_000.0, 2..60), period in 1usize..20) {
            if let Some(value) = rsi(&prices, period) {
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}
