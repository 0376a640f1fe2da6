//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), defined once both EMAs are.
//! Signal Line = EMA(signal) of the MACD line, seeded with the first
//! defined MACD value (not with a mean).
//! Histogram = MACD Line - Signal Line, and 0.0 whenever either side is
//! undefined. The histogram is therefore always defined.

use crate::domain::indicator::{calculate_ema, ema_step, IndicatorSeries, IndicatorType};

pub fn macd_line(fast: Option<f64>, slow: Option<f64>) -> Option<f64> {
    Some(fast? - slow?)
}

/// Advance the signal line by one step.
pub fn signal_step(prev: Option<f64>, macd: Option<f64>, period: usize) -> Option<f64> {
    let macd = macd?;
    Some(match prev {
        Some(prev) => ema_step(prev, macd, period),
        None => macd,
    })
}

pub fn histogram(macd: Option<f64>, signal: Option<f64>) -> f64 {
    match (macd, signal) {
        (Some(m), Some(s)) => m - s,
        _ => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub line: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

pub fn calculate_macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> MacdSeries {
    let ema_fast = calculate_ema(prices, fast);
    let ema_slow = calculate_ema(prices, slow);

    let mut line = IndicatorSeries::with_capacity(IndicatorType::Macd { fast, slow }, prices.len());
    let mut signal = IndicatorSeries::with_capacity(
        IndicatorType::MacdSignal {
            fast,
            slow,
            signal: signal_period,
        },
        prices.len(),
    );
    let mut hist = IndicatorSeries::with_capacity(
        IndicatorType::MacdHistogram {
            fast,
            slow,
            signal: signal_period,
        },
        prices.len(),
    );

    let mut prev_signal = None;
    for i in 0..prices.len() {
        let m = macd_line(ema_fast.values[i], ema_slow.values[i]);
        let s = signal_step(prev_signal, m, signal_period);
        line.push(m);
        signal.push(s);
        hist.push(Some(histogram(m, s)));
        prev_signal = s;
    }

    MacdSeries {
        line,
        signal,
        histogram: hist,
    }
}
