//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) points are undefined.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// One recursive EMA update.
pub fn ema_step(prev: f64, value: f64, period: usize) -> f64 {
    let k = smoothing(period);
    value * k + prev * (1.0 - k)
}

pub fn calculate_ema(prices: &[f64], period: usize) -> IndicatorSeries {
    let mut series = IndicatorSeries::with_capacity(IndicatorType::Ema(period), prices.len());
    if period == 0 {
        series.values = vec![None; prices.len()];
        return series;
    }

    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &close) in prices.iter().enumerate() {
        if i < period - 1 {
            sum += close;
            series.push(None);
        } else if i == period - 1 {
            sum += close;
            ema = sum / period as f64;
            series.push(Some(ema));
        } else {
            ema = ema_step(ema, close, period);
            series.push(Some(ema));
        }
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let series = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        assert!(series.values[0].is_none());
        assert!(series.values[1].is_none());
        assert!(series.values[2].is_some());
        assert!(series.values[3].is_some());
        assert!(series.values[4].is_some());
    }

    #[test]
    fn ema_period_1() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 1);

        assert!((series.values[0].unwrap() - 10.0).abs() < f64::EPSILON);
        assert!((series.values[1].unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((series.values[2].unwrap() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_seed_is_sma() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 3);
        let expected_sma = (10.0 + 20.0 + 30.0) / 3.0;
        assert!((series.values[2].unwrap() - expected_sma).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        let k = 2.0 / 4.0;
        let sma = (10.0 + 20.0 + 30.0) / 3.0;

        let ema_3 = 40.0 * k + sma * (1.0 - k);
        assert!((series.values[3].unwrap() - ema_3).abs() < f64::EPSILON);

        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);
        assert!((series.values[4].unwrap() - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&[100.0; 5], 3);
        for v in series.values.iter().skip(2) {
            assert!((v.unwrap() - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_period_0() {
        let series = calculate_ema(&[10.0, 20.0], 0);
        assert_eq!(series.values, vec![None, None]);
    }

    #[test]
    fn ema_smoothing_factor() {
        assert!((smoothing(10) - 2.0 / 11.0).abs() < f64::EPSILON);
    }
}
