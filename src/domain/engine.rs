//! Stepping engine: indicator tracker and state machine advanced in lockstep.
//!
//! Both the batch backtest and the live session drive an [`Engine`], so a
//! point processed by either path produces the same indicators, transitions
//! and P&L.

use chrono::NaiveDate;

use crate::domain::backtest::{BacktestResult, EndOfRun, StepRecord};
use crate::domain::error::MomtraderError;
use crate::domain::position::{PositionState, Trade, TradeEvent};
use crate::domain::price::PricePoint;
use crate::domain::rule_eval::EvalContext;
use crate::domain::state_machine::{Guards, StrategyState, Transition};
use crate::domain::strategy::Strategy;
use crate::domain::tracker::{IndicatorFrame, IndicatorTracker};

/// What happened at one processed point.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub position: PositionState,
    pub running_pnl: f64,
    pub transition: Transition,
}

#[derive(Debug, Clone)]
pub struct Engine {
    strategy_name: String,
    guards: Guards,
    tracker: IndicatorTracker,
    state: StrategyState,
    previous: Option<(PricePoint, IndicatorFrame)>,
    first_close: Option<f64>,
    events: Vec<TradeEvent>,
    trades: Vec<Trade>,
    steps: Vec<StepRecord>,
}

impl Engine {
    pub fn new(strategy: &Strategy, record_series: bool) -> Self {
        Self {
            strategy_name: strategy.name.clone(),
            guards: Guards::new(strategy),
            tracker: IndicatorTracker::new(&strategy.tracked_indicators(), record_series),
            state: StrategyState::default(),
            previous: None,
            first_close: None,
            events: Vec::new(),
            trades: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Process the next point. Dates must be strictly increasing and prices
    /// finite and positive; a violation rejects the point and leaves the
    /// engine untouched.
    pub fn advance(&mut self, point: PricePoint) -> Result<StepReport, MomtraderError> {
        point.check_price()?;
        if let Some(previous) = self.last_date() {
            if point.date <= previous {
                return Err(MomtraderError::NonMonotonic {
                    previous,
                    next: point.date,
                });
            }
        }

        let frame = self.tracker.update(&point);
        let mut ctx = EvalContext::new(&point, frame);
        if let Some((prev_point, prev_frame)) = &self.previous {
            ctx = ctx.with_previous(prev_point, prev_frame);
        }
        let (state, outcome) = std::mem::take(&mut self.state).step(&self.guards, &ctx);
        let frame = frame.clone();
        self.state = state;

        match &outcome.transition {
            Transition::Entered(event) => {
                tracing::debug!(date = %event.date, price = event.price, "BUY");
                self.events.push(event.clone());
            }
            Transition::Exited(trade) => {
                tracing::debug!(
                    date = %trade.exit_date,
                    price = trade.exit_price,
                    pnl = trade.pnl,
                    reason = %trade.exit_reason,
                    "SELL"
                );
                self.events.push(TradeEvent::sell(
                    trade.exit_date,
                    trade.exit_price,
                    trade.exit_reason,
                ));
                self.trades.push(trade.clone());
            }
            Transition::Warmup | Transition::Hold => {}
        }

        let report = StepReport {
            index: self.steps.len(),
            date: point.date,
            price: point.close,
            position: self.state.position_state(),
            running_pnl: outcome.running_pnl,
            transition: outcome.transition,
        };

        self.first_close.get_or_insert(point.close);
        self.steps.push(StepRecord {
            date: report.date,
            price: report.price,
            position: report.position,
            running_pnl: report.running_pnl,
        });
        self.previous = Some((point, frame));
        Ok(report)
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.previous.as_ref().map(|(p, _)| p.date)
    }

    pub fn last_point(&self) -> Option<&PricePoint> {
        self.previous.as_ref().map(|(p, _)| p)
    }

    pub fn processed(&self) -> usize {
        self.steps.len()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn events(&self) -> &[TradeEvent] {
        &self.events
    }

    /// Indicator values at the last processed point.
    pub fn frame(&self) -> &IndicatorFrame {
        self.tracker.frame()
    }

    pub fn running_pnl(&self) -> f64 {
        self.last_point()
            .map_or(self.state.realized_pnl, |p| self.state.running_pnl(p.close))
    }

    /// Apply the end-of-run policy and assemble the result.
    pub fn finish(mut self, end_of_run: EndOfRun) -> BacktestResult {
        let last = self.previous.take().map(|(point, _)| point);
        let mut open_position = None;

        if let Some(last) = &last {
            match end_of_run {
                EndOfRun::ForceClose => {
                    let (state, trade) = std::mem::take(&mut self.state).force_close(last);
                    self.state = state;
                    if let Some(trade) = trade {
                        tracing::debug!(
                            date = %trade.exit_date,
                            price = trade.exit_price,
                            pnl = trade.pnl,
                            "SELL (end of data)"
                        );
                        self.events.push(TradeEvent::sell(
                            trade.exit_date,
                            trade.exit_price,
                            trade.exit_reason,
                        ));
                        self.trades.push(trade);
                    }
                    // only a position bought on the last point survives
                    open_position = self.state.position.clone();
                }
                EndOfRun::LeaveOpen => open_position = self.state.position.clone(),
            }
        }

        let final_pnl = last
            .as_ref()
            .map_or(self.state.realized_pnl, |p| self.state.running_pnl(p.close));
        let last_close = last.map(|p| p.close);

        BacktestResult {
            strategy_name: self.strategy_name,
            final_pnl,
            trade_count: self.state.trade_count,
            trades: self.trades,
            events: self.events,
            steps: self.steps,
            indicators: self.tracker.into_series(),
            open_position,
            first_close: self.first_close,
            last_close,
        }
    }
}
