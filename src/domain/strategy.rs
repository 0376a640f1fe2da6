//! Strategy configuration and composition.
//!
//! A strategy is a pair of entry/exit rules plus an optional trailing stop.
//! The built-in variants are presets assembled from [`StrategyParameters`];
//! custom strategies supply their own rules.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::MomtraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{extract_indicators, Operand, Rule};

/// Built-in entry/exit predicate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Falling trend slope, price above SMA, oversold stochastic.
    TrendReversal,
    /// Short EMA crossing the long EMA, gated by RSI.
    EmaCrossRsi,
    MacdRsi,
    /// Price/SMA with RSI bounds and a trailing stop.
    SmaRsiStop,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::TrendReversal,
        StrategyKind::EmaCrossRsi,
        StrategyKind::MacdRsi,
        StrategyKind::SmaRsiStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::TrendReversal => "trend_reversal",
            StrategyKind::EmaCrossRsi => "ema_cross_rsi",
            StrategyKind::MacdRsi => "macd_rsi",
            StrategyKind::SmaRsiStop => "sma_rsi_stop",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown strategy kind '{}' (expected one of: trend_reversal, ema_cross_rsi, macd_rsi, sma_rsi_stop)",
                    s
                )
            })
    }
}

pub const DEFAULT_STOP_FRACTION: f64 = 0.05;

/// Window sizes and thresholds for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParameters {
    pub sma_window: usize,
    pub so_window: usize,
    pub trend_window: usize,
    pub rsi_window: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub signal_window: usize,
    pub volatility_window: usize,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub so_low: f64,
    pub so_high: f64,
    pub trailing_stop: Option<f64>,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            sma_window: 26,
            so_window: 6,
            trend_window: 4,
            rsi_window: 13,
            ema_short: 5,
            ema_long: 23,
            signal_window: 13,
            volatility_window: 20,
            rsi_low: 40.0,
            rsi_high: 75.0,
            so_low: 20.0,
            so_high: 80.0,
            trailing_stop: None,
        }
    }
}

impl StrategyParameters {
    /// Defaults tuned for one preset. `sma_rsi_stop` watches a short SMA(5)
    /// with a slow RSI(25) and exits at 70; the others share [`Default`].
    pub fn for_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::SmaRsiStop => Self {
                sma_window: 5,
                rsi_window: 25,
                rsi_high: 70.0,
                ..Self::default()
            },
            StrategyKind::TrendReversal | StrategyKind::EmaCrossRsi | StrategyKind::MacdRsi => {
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), MomtraderError> {
        let invalid = |reason: String| -> Result<(), MomtraderError> {
            Err(MomtraderError::InvalidParameters { reason })
        };

        for (name, value) in [
            ("sma_window", self.sma_window),
            ("so_window", self.so_window),
            ("rsi_window", self.rsi_window),
            ("ema_short", self.ema_short),
            ("ema_long", self.ema_long),
            ("signal_window", self.signal_window),
        ] {
            if value == 0 {
                return invalid(format!("{} must be positive", name));
            }
        }
        if self.trend_window < 2 {
            return invalid(format!(
                "trend_window must be at least 2, got {}",
                self.trend_window
            ));
        }
        if self.volatility_window < 2 {
            return invalid(format!(
                "volatility_window must be at least 2, got {}",
                self.volatility_window
            ));
        }
        if self.ema_short >= self.ema_long {
            return invalid(format!(
                "ema_short ({}) must be less than ema_long ({})",
                self.ema_short, self.ema_long
            ));
        }
        for (low_name, low, high_name, high) in [
            ("rsi_low", self.rsi_low, "rsi_high", self.rsi_high),
            ("so_low", self.so_low, "so_high", self.so_high),
        ] {
            if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) {
                return invalid(format!(
                    "{} and {} must lie within [0, 100]",
                    low_name, high_name
                ));
            }
            if low >= high {
                return invalid(format!(
                    "{} ({}) must be less than {} ({})",
                    low_name, low, high_name, high
                ));
            }
        }
        if let Some(stop) = self.trailing_stop {
            validate_stop(stop)?;
        }
        Ok(())
    }
}

fn validate_stop(stop: f64) -> Result<(), MomtraderError> {
    if stop > 0.0 && stop < 1.0 {
        Ok(())
    } else {
        Err(MomtraderError::InvalidParameters {
            reason: format!("trailing_stop must be a fraction in (0, 1), got {}", stop),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub entry: Rule,
    pub exit: Rule,
    /// Exit when price falls to `high_water_mark * (1 - fraction)`.
    pub trailing_stop: Option<f64>,
    /// Indicators tracked for inspection only; they never gate trading.
    pub extra_indicators: Vec<IndicatorType>,
}

impl Strategy {
    /// Custom strategy from user rules. Every indicator the rules read is
    /// checked for a usable window.
    pub fn custom(
        name: impl Into<String>,
        entry: Rule,
        exit: Rule,
        trailing_stop: Option<f64>,
    ) -> Result<Self, MomtraderError> {
        let strategy = Self {
            name: name.into(),
            entry,
            exit,
            trailing_stop,
            extra_indicators: Vec::new(),
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Build one of the preset variants from validated parameters.
    pub fn preset(kind: StrategyKind, params: &StrategyParameters) -> Result<Self, MomtraderError> {
        params.validate()?;

        let price = || Operand::Price;
        let constant = Operand::Constant;
        let rsi = || Operand::indicator(IndicatorType::Rsi(params.rsi_window));

        let (entry, exit, default_stop) = match kind {
            StrategyKind::TrendReversal => {
                let sma_type = IndicatorType::Sma(params.sma_window);
                let slope = || {
                    Operand::indicator(IndicatorType::slope_of(
                        sma_type.clone(),
                        params.trend_window,
                    ))
                };
                let stoch = || Operand::indicator(IndicatorType::Stochastic(params.so_window));
                let sma = || Operand::indicator(sma_type.clone());
                (
                    Rule::And(vec![
                        Rule::below(slope(), constant(0.0)),
                        Rule::above(price(), sma()),
                        Rule::below(stoch(), constant(params.so_low)),
                    ]),
                    Rule::And(vec![
                        Rule::above(slope(), constant(0.0)),
                        Rule::below(price(), sma()),
                        Rule::above(stoch(), constant(params.so_high)),
                    ]),
                    None,
                )
            }
            StrategyKind::EmaCrossRsi => {
                let short = || Operand::indicator(IndicatorType::Ema(params.ema_short));
                let long = || Operand::indicator(IndicatorType::Ema(params.ema_long));
                (
                    Rule::And(vec![
                        Rule::CrossAbove {
                            left: short(),
                            right: long(),
                        },
                        Rule::below(rsi(), constant(params.rsi_low)),
                    ]),
                    Rule::And(vec![
                        Rule::CrossBelow {
                            left: short(),
                            right: long(),
                        },
                        Rule::above(rsi(), constant(params.rsi_high)),
                    ]),
                    None,
                )
            }
            StrategyKind::MacdRsi => {
                let macd = || {
                    Operand::indicator(IndicatorType::Macd {
                        fast: params.ema_short,
                        slow: params.ema_long,
                    })
                };
                let signal = || {
                    Operand::indicator(IndicatorType::MacdSignal {
                        fast: params.ema_short,
                        slow: params.ema_long,
                        signal: params.signal_window,
                    })
                };
                (
                    Rule::And(vec![
                        Rule::above(macd(), signal()),
                        Rule::below(rsi(), constant(params.rsi_low)),
                    ]),
                    Rule::And(vec![
                        Rule::below(macd(), signal()),
                        Rule::above(rsi(), constant(params.rsi_high)),
                    ]),
                    None,
                )
            }
            StrategyKind::SmaRsiStop => {
                let sma = || Operand::indicator(IndicatorType::Sma(params.sma_window));
                (
                    Rule::And(vec![
                        Rule::above(price(), sma()),
                        Rule::Between {
                            operand: rsi(),
                            lower: 0.0,
                            upper: params.rsi_low,
                        },
                    ]),
                    Rule::Or(vec![
                        Rule::below(price(), sma()),
                        Rule::Between {
                            operand: rsi(),
                            lower: params.rsi_high,
                            upper: 100.0,
                        },
                    ]),
                    Some(DEFAULT_STOP_FRACTION),
                )
            }
        };

        let strategy = Self {
            name: kind.to_string(),
            entry,
            exit,
            trailing_stop: params.trailing_stop.or(default_stop),
            extra_indicators: vec![IndicatorType::Volatility(params.volatility_window)],
        };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Indicators the entry and exit rules read. Trading is not evaluated
    /// until all of them are defined.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut out = extract_indicators(&self.entry);
        for t in extract_indicators(&self.exit) {
            if !out.contains(&t) {
                out.push(t);
            }
        }
        out
    }

    /// Required indicators followed by the inspection-only extras.
    pub fn tracked_indicators(&self) -> Vec<IndicatorType> {
        let mut out = self.required_indicators();
        for t in &self.extra_indicators {
            if !out.contains(t) {
                out.push(t.clone());
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), MomtraderError> {
        for t in self.tracked_indicators() {
            t.validate()
                .map_err(|reason| MomtraderError::RuleInvalid { reason })?;
        }
        if let Some(stop) = self.trailing_stop {
            validate_stop(stop)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert_eq!(
            "MACD_RSI".parse::<StrategyKind>().unwrap(),
            StrategyKind::MacdRsi
        );
        assert!("momentum".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn default_parameters_are_valid() {
        assert!(StrategyParameters::default().validate().is_ok());
    }

    #[test]
    fn short_ema_must_be_below_long() {
        let params = StrategyParameters {
            ema_short: 23,
            ema_long: 23,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("ema_short"));
    }

    #[test]
    fn zero_window_rejected() {
        let params = StrategyParameters {
            rsi_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MomtraderError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let params = StrategyParameters {
            so_low: 80.0,
            so_high: 20.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = StrategyParameters {
            rsi_high: 120.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn trailing_stop_must_be_fraction() {
        for stop in [0.0, 1.0, -0.1, 1.5] {
            let params = StrategyParameters {
                trailing_stop: Some(stop),
                ..Default::default()
            };
            assert!(params.validate().is_err(), "stop {} accepted", stop);
        }
    }

    #[test]
    fn trend_reversal_rules() {
        let s = Strategy::preset(StrategyKind::TrendReversal, &StrategyParameters::default())
            .unwrap();
        assert_eq!(
            s.entry.to_string(),
            "AND(BELOW(SLOPE(SMA(26),4), 0), ABOVE(price, SMA(26)), BELOW(STOCH(6), 20))"
        );
        assert_eq!(
            s.exit.to_string(),
            "AND(ABOVE(SLOPE(SMA(26),4), 0), BELOW(price, SMA(26)), ABOVE(STOCH(6), 80))"
        );
        assert_eq!(s.trailing_stop, None);
        assert_eq!(s.name, "trend_reversal");
    }

    #[test]
    fn ema_cross_rsi_fires_on_the_crossing_bar_only() {
        let s = Strategy::preset(StrategyKind::EmaCrossRsi, &StrategyParameters::default())
            .unwrap();
        assert_eq!(
            s.entry.to_string(),
            "AND(CROSS_ABOVE(EMA(5), EMA(23)), BELOW(RSI(13), 40))"
        );
        assert_eq!(
            s.exit.to_string(),
            "AND(CROSS_BELOW(EMA(5), EMA(23)), ABOVE(RSI(13), 75))"
        );
    }

    #[test]
    fn macd_rsi_rules_use_ema_windows() {
        let s = Strategy::preset(StrategyKind::MacdRsi, &StrategyParameters::default()).unwrap();
        assert_eq!(
            s.entry.to_string(),
            "AND(ABOVE(MACD(5,23), MACD_SIGNAL(5,23,13)), BELOW(RSI(13), 40))"
        );
        assert_eq!(
            s.required_indicators(),
            vec![
                IndicatorType::Macd { fast: 5, slow: 23 },
                IndicatorType::MacdSignal {
                    fast: 5,
                    slow: 23,
                    signal: 13
                },
                IndicatorType::Rsi(13),
            ]
        );
    }

    #[test]
    fn sma_rsi_stop_defaults_to_five_percent() {
        let s = Strategy::preset(StrategyKind::SmaRsiStop, &StrategyParameters::default()).unwrap();
        assert_eq!(s.trailing_stop, Some(0.05));
        assert!(matches!(s.exit, Rule::Or(_)));

        let params = StrategyParameters {
            trailing_stop: Some(0.1),
            ..Default::default()
        };
        let s = Strategy::preset(StrategyKind::SmaRsiStop, &params).unwrap();
        assert_eq!(s.trailing_stop, Some(0.1));
    }

    #[test]
    fn sma_rsi_stop_has_its_own_defaults() {
        let params = StrategyParameters::for_kind(StrategyKind::SmaRsiStop);
        assert!(params.validate().is_ok());
        let s = Strategy::preset(StrategyKind::SmaRsiStop, &params).unwrap();
        assert_eq!(
            s.entry.to_string(),
            "AND(ABOVE(price, SMA(5)), BETWEEN(RSI(25), 0, 40))"
        );
        assert_eq!(
            s.exit.to_string(),
            "OR(BELOW(price, SMA(5)), BETWEEN(RSI(25), 70, 100))"
        );
        assert_eq!(s.trailing_stop, Some(0.05));

        assert_eq!(
            StrategyParameters::for_kind(StrategyKind::MacdRsi),
            StrategyParameters::default()
        );
    }

    #[test]
    fn trailing_stop_attaches_to_any_preset() {
        let params = StrategyParameters {
            trailing_stop: Some(0.08),
            ..Default::default()
        };
        let s = Strategy::preset(StrategyKind::EmaCrossRsi, &params).unwrap();
        assert_eq!(s.trailing_stop, Some(0.08));
    }

    #[test]
    fn extras_are_tracked_but_not_required() {
        let s = Strategy::preset(StrategyKind::EmaCrossRsi, &StrategyParameters::default())
            .unwrap();
        let vol = IndicatorType::Volatility(20);
        assert!(!s.required_indicators().contains(&vol));
        assert!(s.tracked_indicators().contains(&vol));
    }

    #[test]
    fn custom_rejects_degenerate_indicator() {
        let err = Strategy::custom(
            "bad",
            Rule::above(Operand::Price, Operand::indicator(IndicatorType::Sma(0))),
            Rule::Always,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MomtraderError::RuleInvalid { .. }));
    }

    #[test]
    fn custom_with_always_rules() {
        let s = Strategy::custom("always", Rule::Always, Rule::Always, None).unwrap();
        assert!(s.required_indicators().is_empty());
        assert_eq!(s.with_name("renamed").name, "renamed");
    }
}
