//! Backtest driver.
//!
//! Runs one strategy over a price history, feeding every point once and in
//! date order through an [`Engine`]. No I/O happens here; the result is
//! handed to report adapters by the caller.

use chrono::NaiveDate;

use crate::domain::engine::Engine;
use crate::domain::error::MomtraderError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::position::{OpenPosition, PositionState, Trade, TradeEvent};
use crate::domain::price::PriceHistory;
use crate::domain::strategy::Strategy;

/// What to do with a position still open when the history runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfRun {
    /// Sell at the last price, counting it as a trade. A position bought
    /// on the last point is reported as open instead.
    #[default]
    ForceClose,
    /// Report the position separately; its unrealized P&L stays in the
    /// final P&L but it is not counted as a trade.
    LeaveOpen,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestConfig {
    pub end_of_run: EndOfRun,
    /// Keep the full per-step indicator series in the result.
    pub record_series: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub date: NaiveDate,
    pub price: f64,
    pub position: PositionState,
    pub running_pnl: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub final_pnl: f64,
    pub trade_count: usize,
    pub trades: Vec<Trade>,
    pub events: Vec<TradeEvent>,
    pub steps: Vec<StepRecord>,
    /// Empty unless [`BacktestConfig::record_series`] was set.
    pub indicators: Vec<IndicatorSeries>,
    pub open_position: Option<OpenPosition>,
    pub first_close: Option<f64>,
    pub last_close: Option<f64>,
}

impl BacktestResult {
    pub fn pnl_curve(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.running_pnl).collect()
    }

    pub fn series(&self, indicator: &IndicatorType) -> Option<&IndicatorSeries> {
        self.indicators
            .iter()
            .find(|s| &s.indicator_type == indicator)
    }
}

pub fn run_backtest(
    history: &PriceHistory,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, MomtraderError> {
    let mut engine = Engine::new(strategy, config.record_series);
    for point in history.points() {
        engine.advance(point.clone())?;
    }
    Ok(engine.finish(config.end_of_run))
}
