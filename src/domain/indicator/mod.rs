//! Technical indicator implementations.
//!
//! This module provides types for representing indicator identity and series:
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: one optional value per processed price point
//!
//! Each submodule exposes a pure point function over a trailing window
//! (returning `None` while history is insufficient) and a batch
//! `calculate_*` helper producing a whole series.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod trend;
pub mod volatility;

pub use ema::{calculate_ema, ema_step, smoothing};
pub use macd::{calculate_macd, histogram, macd_line, signal_step, MacdSeries};
pub use rsi::{calculate_rsi, rsi};
pub use sma::{calculate_sma, sma};
pub use stochastic::{calculate_stochastic, stochastic};
pub use trend::{calculate_slope, ols_slope, slope};
pub use volatility::{calculate_volatility, sample_stddev};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Stochastic(usize),
    Volatility(usize),
    Macd {
        fast: usize,
        slow: usize,
    },
    MacdSignal {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdHistogram {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Slope {
        source: Box<IndicatorType>,
        window: usize,
    },
}

impl IndicatorType {
    pub fn slope_of(source: IndicatorType, window: usize) -> Self {
        IndicatorType::Slope {
            source: Box::new(source),
            window,
        }
    }

    /// Indicators whose values this one is derived from.
    pub fn dependencies(&self) -> Vec<IndicatorType> {
        match self {
            IndicatorType::Macd { fast, slow } => {
                vec![IndicatorType::Ema(*fast), IndicatorType::Ema(*slow)]
            }
            IndicatorType::MacdSignal { fast, slow, .. } => vec![IndicatorType::Macd {
                fast: *fast,
                slow: *slow,
            }],
            IndicatorType::MacdHistogram { fast, slow, signal } => vec![
                IndicatorType::Macd {
                    fast: *fast,
                    slow: *slow,
                },
                IndicatorType::MacdSignal {
                    fast: *fast,
                    slow: *slow,
                    signal: *signal,
                },
            ],
            IndicatorType::Slope { source, .. } => vec![source.as_ref().clone()],
            _ => Vec::new(),
        }
    }

    /// Trailing closes that must be retained to compute this indicator.
    pub fn price_lookback(&self) -> usize {
        match self {
            IndicatorType::Sma(n) | IndicatorType::Ema(n) | IndicatorType::Stochastic(n) => *n,
            IndicatorType::Rsi(n) => n + 1,
            _ => 0,
        }
    }

    /// Trailing returns that must be retained to compute this indicator.
    pub fn return_lookback(&self) -> usize {
        match self {
            IndicatorType::Volatility(n) => *n,
            _ => 0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            IndicatorType::Sma(0)
            | IndicatorType::Ema(0)
            | IndicatorType::Rsi(0)
            | IndicatorType::Stochastic(0) => Err(format!("{self}: period must be positive")),
            IndicatorType::Volatility(n) if *n < 2 => {
                Err(format!("{self}: period must be at least 2"))
            }
            IndicatorType::Macd { fast, slow } if *fast == 0 || *slow == 0 => {
                Err(format!("{self}: periods must be positive"))
            }
            IndicatorType::MacdSignal { fast, slow, signal }
            | IndicatorType::MacdHistogram { fast, slow, signal }
                if *fast == 0 || *slow == 0 || *signal == 0 =>
            {
                Err(format!("{self}: periods must be positive"))
            }
            IndicatorType::Slope { source, window } => {
                if *window < 2 {
                    return Err(format!("{self}: window must be at least 2"));
                }
                source.validate()
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stochastic(period) => write!(f, "STOCH({})", period),
            IndicatorType::Volatility(period) => write!(f, "VOL({})", period),
            IndicatorType::Macd { fast, slow } => write!(f, "MACD({},{})", fast, slow),
            IndicatorType::MacdSignal { fast, slow, signal } => {
                write!(f, "MACD_SIGNAL({},{},{})", fast, slow, signal)
            }
            IndicatorType::MacdHistogram { fast, slow, signal } => {
                write!(f, "MACD_HIST({},{},{})", fast, slow, signal)
            }
            IndicatorType::Slope { source, window } => write!(f, "SLOPE({},{})", source, window),
        }
    }
}

/// Named sequence of optional values, index-aligned with the processed prices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn new(indicator_type: IndicatorType) -> Self {
        Self {
            indicator_type,
            values: Vec::new(),
        }
    }

    pub fn with_capacity(indicator_type: IndicatorType, capacity: usize) -> Self {
        Self {
            indicator_type,
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Index of the first defined value.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }
}
