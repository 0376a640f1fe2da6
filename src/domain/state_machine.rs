//! FLAT/LONG strategy state machine.
//!
//! [`StrategyState`] is a plain value threaded through [`StrategyState::step`]:
//! each call consumes the state and one evaluated price point and returns the
//! next state plus what happened. Nothing else mutates position or P&L.

use crate::domain::indicator::IndicatorType;
use crate::domain::position::{ExitReason, OpenPosition, PositionState, Trade, TradeEvent};
use crate::domain::price::PricePoint;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::{evaluate, EvalContext};
use crate::domain::strategy::Strategy;

/// Entry/exit guards with the indicator set they depend on precomputed.
#[derive(Debug, Clone)]
pub struct Guards {
    entry: Rule,
    exit: Rule,
    trailing_stop: Option<f64>,
    required: Vec<IndicatorType>,
}

impl Guards {
    pub fn new(strategy: &Strategy) -> Self {
        Self {
            entry: strategy.entry.clone(),
            exit: strategy.exit.clone(),
            trailing_stop: strategy.trailing_stop,
            required: strategy.required_indicators(),
        }
    }

    pub fn required(&self) -> &[IndicatorType] {
        &self.required
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Guards not evaluated: some required indicator is still undefined.
    Warmup,
    Hold,
    Entered(TradeEvent),
    Exited(Trade),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub transition: Transition,
    /// Realized P&L plus the unrealized P&L of an open position.
    pub running_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyState {
    pub position: Option<OpenPosition>,
    pub realized_pnl: f64,
    pub trade_count: usize,
}

impl StrategyState {
    pub fn position_state(&self) -> PositionState {
        if self.position.is_some() {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }

    pub fn running_pnl(&self, price: f64) -> f64 {
        self.realized_pnl
            + self
                .position
                .as_ref()
                .map_or(0.0, |p| p.unrealized_pnl(price))
    }

    /// Advance one point. `ctx` must describe the point being processed,
    /// with indicators already updated for it.
    pub fn step(mut self, guards: &Guards, ctx: &EvalContext<'_>) -> (Self, StepOutcome) {
        let point = ctx.current.point;

        let transition = if !ctx.all_defined(&guards.required) {
            Transition::Warmup
        } else {
            match self.position.take() {
                None => {
                    if evaluate(&guards.entry, ctx) {
                        self.position = Some(OpenPosition::open(point.date, point.close));
                        Transition::Entered(TradeEvent::buy(point.date, point.close))
                    } else {
                        Transition::Hold
                    }
                }
                Some(mut open) => {
                    open.high_water_mark = open.high_water_mark.max(point.close);

                    let reason = if evaluate(&guards.exit, ctx) {
                        Some(ExitReason::Signal)
                    } else {
                        guards
                            .trailing_stop
                            .filter(|f| open.should_stop(point.close, *f))
                            .map(|_| ExitReason::TrailingStop)
                    };

                    match reason {
                        Some(reason) => Transition::Exited(self.realize(&open, point, reason)),
                        None => {
                            self.position = Some(open);
                            Transition::Hold
                        }
                    }
                }
            }
        };

        let running_pnl = self.running_pnl(point.close);
        (
            self,
            StepOutcome {
                transition,
                running_pnl,
            },
        )
    }

    /// Close any open position at `point` regardless of the guards.
    ///
    /// A position opened on `point`'s own date stays open: a trade always
    /// exits strictly after it entered.
    pub fn force_close(mut self, point: &PricePoint) -> (Self, Option<Trade>) {
        let trade = match self.position.take() {
            Some(open) if open.entry_date < point.date => {
                Some(self.realize(&open, point, ExitReason::EndOfData))
            }
            other => {
                self.position = other;
                None
            }
        };
        (self, trade)
    }

    fn realize(&mut self, open: &OpenPosition, point: &PricePoint, reason: ExitReason) -> Trade {
        let trade = open.close(point.date, point.close, reason);
        self.realized_pnl += trade.pnl;
        self.trade_count += 1;
        trade
    }
}
