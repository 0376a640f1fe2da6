//! Configuration loading and validation.
//!
//! Reads every section the application uses into typed settings, failing
//! with the offending `[section] key` before any backtest runs.

use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::backtest::{BacktestConfig, EndOfRun};
use crate::domain::error::MomtraderError;
use crate::domain::grid_search::ParamGrid;
use crate::domain::rule_parser;
use crate::domain::strategy::{Strategy, StrategyKind, StrategyParameters};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TOP: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub date_column: String,
    pub price_column: String,
    pub volume_column: String,
    pub return_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategySpec {
    Preset(StrategyKind),
    Custom { entry: String, exit: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub name: Option<String>,
    pub spec: StrategySpec,
    pub params: StrategyParameters,
}

impl StrategySettings {
    pub fn build(&self) -> Result<Strategy, MomtraderError> {
        let strategy = match &self.spec {
            StrategySpec::Preset(kind) => Strategy::preset(*kind, &self.params)?,
            StrategySpec::Custom { entry, exit } => Strategy::custom(
                "custom",
                parse_rule(entry)?,
                parse_rule(exit)?,
                self.params.trailing_stop,
            )?,
        };
        Ok(match &self.name {
            Some(name) => strategy.with_name(name.clone()),
            None => strategy,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub grid: ParamGrid,
    pub parallel: bool,
    pub top: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data: DataSettings,
    pub strategy: StrategySettings,
    pub backtest: BacktestConfig,
    pub grid: GridSettings,
}

pub fn load_app_config(config: &dyn ConfigPort) -> Result<AppConfig, MomtraderError> {
    let app = AppConfig {
        data: load_data_settings(config)?,
        strategy: load_strategy_settings(config)?,
        backtest: load_backtest_config(config)?,
        grid: load_grid_settings(config)?,
    };
    app.strategy.build()?;
    Ok(app)
}

pub fn load_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, MomtraderError> {
    let start_date = match non_empty(config, "data", "start_date") {
        None => None,
        Some(s) => Some(NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            invalid("data", "start_date", "expected YYYY-MM-DD".to_string())
        })?),
    };
    let column = |key: &str, default: &str| {
        non_empty(config, "data", key).unwrap_or_else(|| default.to_string())
    };

    Ok(DataSettings {
        path: non_empty(config, "data", "path"),
        start_date,
        date_column: column("date_column", "date"),
        price_column: column("price_column", "PRC"),
        volume_column: column("volume_column", "VOL"),
        return_column: column("return_column", "RET"),
    })
}

pub fn load_strategy_settings(config: &dyn ConfigPort) -> Result<StrategySettings, MomtraderError> {
    let entry = non_empty(config, "strategy", "entry");
    let exit = non_empty(config, "strategy", "exit");
    let kind = non_empty(config, "strategy", "kind");

    let spec = match kind.as_deref() {
        Some(k) if k.eq_ignore_ascii_case("custom") => custom_spec(entry, exit)?,
        None if entry.is_some() => custom_spec(entry, exit)?,
        None => {
            return Err(MomtraderError::ConfigMissing {
                section: "strategy".to_string(),
                key: "kind".to_string(),
            })
        }
        Some(k) => StrategySpec::Preset(
            StrategyKind::from_str(k).map_err(|reason| invalid("strategy", "kind", reason))?,
        ),
    };

    let defaults = match &spec {
        StrategySpec::Preset(kind) => StrategyParameters::for_kind(*kind),
        StrategySpec::Custom { .. } => StrategyParameters::default(),
    };

    let trailing_stop = match read_double(config, "strategy", "trailing_stop")? {
        Some(value) if value <= 0.0 || value >= 1.0 => {
            return Err(invalid(
                "strategy",
                "trailing_stop",
                "trailing_stop must be a fraction between 0 and 1".to_string(),
            ))
        }
        stop => stop,
    };

    let params = StrategyParameters {
        sma_window: read_window(config, "sma_window", defaults.sma_window)?,
        so_window: read_window(config, "so_window", defaults.so_window)?,
        trend_window: read_window(config, "trend_window", defaults.trend_window)?,
        rsi_window: read_window(config, "rsi_window", defaults.rsi_window)?,
        ema_short: read_window(config, "ema_short", defaults.ema_short)?,
        ema_long: read_window(config, "ema_long", defaults.ema_long)?,
        signal_window: read_window(config, "signal_window", defaults.signal_window)?,
        volatility_window: read_window(config, "volatility_window", defaults.volatility_window)?,
        rsi_low: read_threshold(config, "rsi_low", defaults.rsi_low)?,
        rsi_high: read_threshold(config, "rsi_high", defaults.rsi_high)?,
        so_low: read_threshold(config, "so_low", defaults.so_low)?,
        so_high: read_threshold(config, "so_high", defaults.so_high)?,
        trailing_stop,
    };

    if matches!(spec, StrategySpec::Preset(_)) {
        params.validate()?;
    }

    Ok(StrategySettings {
        name: non_empty(config, "strategy", "name"),
        spec,
        params,
    })
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, MomtraderError> {
    let close_at_end = read_bool(config, "backtest", "close_at_end")?.unwrap_or(true);
    Ok(BacktestConfig {
        end_of_run: if close_at_end {
            EndOfRun::ForceClose
        } else {
            EndOfRun::LeaveOpen
        },
        record_series: false,
    })
}

pub fn load_grid_settings(config: &dyn ConfigPort) -> Result<GridSettings, MomtraderError> {
    let list = |key: &str| -> Result<Vec<usize>, MomtraderError> {
        config
            .get_usize_list("grid", key)
            .map(Option::unwrap_or_default)
            .map_err(|reason| invalid("grid", key, reason))
    };

    let grid = ParamGrid {
        sma_window: list("sma_window")?,
        so_window: list("so_window")?,
        trend_window: list("trend_window")?,
        rsi_window: list("rsi_window")?,
        ema_short: list("ema_short")?,
        ema_long: list("ema_long")?,
        signal_window: list("signal_window")?,
    };

    let top = match read_int(config, "grid", "top")? {
        None => DEFAULT_TOP,
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| invalid("grid", "top", "top must be at least 1".to_string()))?,
    };

    Ok(GridSettings {
        grid,
        parallel: read_bool(config, "grid", "parallel")?.unwrap_or(true),
        top,
    })
}

fn custom_spec(
    entry: Option<String>,
    exit: Option<String>,
) -> Result<StrategySpec, MomtraderError> {
    let missing = |key: &str| MomtraderError::ConfigMissing {
        section: "strategy".to_string(),
        key: key.to_string(),
    };
    let entry = entry.ok_or_else(|| missing("entry"))?;
    let exit = exit.ok_or_else(|| missing("exit"))?;
    parse_rule(&entry)?;
    parse_rule(&exit)?;
    Ok(StrategySpec::Custom { entry, exit })
}

fn parse_rule(text: &str) -> Result<crate::domain::rule::Rule, MomtraderError> {
    rule_parser::parse(text).map_err(|e| {
        tracing::error!("{}", e.display_with_context(text));
        MomtraderError::from(e)
    })
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid(section: &str, key: &str, reason: String) -> MomtraderError {
    MomtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn read_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, MomtraderError> {
    config
        .get_int(section, key)
        .map_err(|reason| invalid(section, key, reason))
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, MomtraderError> {
    config
        .get_double(section, key)
        .map_err(|reason| invalid(section, key, reason))
}

fn read_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<bool>, MomtraderError> {
    config
        .get_bool(section, key)
        .map_err(|reason| invalid(section, key, reason))
}

fn read_window(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, MomtraderError> {
    match read_int(config, "strategy", key)? {
        None => Ok(default),
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| invalid("strategy", key, format!("{} must be positive", key))),
    }
}

fn read_threshold(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, MomtraderError> {
    let value = read_double(config, "strategy", key)?.unwrap_or(default);
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(
            "strategy",
            key,
            format!("{} must be between 0 and 100", key),
        ));
    }
    Ok(value)
}
