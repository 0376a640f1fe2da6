//! Summary statistics for a finished backtest.

use crate::domain::backtest::BacktestResult;
use crate::domain::position::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_pnl: f64,
    pub trade_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
    /// Largest peak-to-trough fall of the running P&L, in price units.
    pub max_drawdown: f64,
    /// Longest stretch of steps spent below a prior P&L peak.
    pub max_drawdown_duration: usize,
    pub total_buy: f64,
    pub total_sell: f64,
    /// `(total_sell - total_buy) / total_buy * 100`; `None` without trades.
    pub return_pct: Option<f64>,
    /// Buy-and-hold return over the whole history, in percent.
    pub underlying_return_pct: Option<f64>,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let trades = &result.trades;

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_holding_days = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_holding_days += trade.holding_days();
        }

        let total_trades = trades.len();
        let ratio = |num: f64, den: usize| if den > 0 { num / den as f64 } else { 0.0 };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let (total_buy, total_sell) = notional(trades);
        let return_pct = (total_buy > 0.0).then(|| (total_sell - total_buy) / total_buy * 100.0);

        let underlying_return_pct = match (result.first_close, result.last_close) {
            (Some(first), Some(last)) if first > 0.0 => Some((last - first) / first * 100.0),
            _ => None,
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&result.pnl_curve());

        Metrics {
            final_pnl: result.final_pnl,
            trade_count: result.trade_count,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate: ratio(trades_won as f64, total_trades),
            profit_factor,
            avg_win: ratio(total_wins, trades_won),
            avg_loss: ratio(total_losses, trades_lost),
            largest_win,
            largest_loss,
            avg_holding_days: ratio(total_holding_days as f64, total_trades),
            max_drawdown,
            max_drawdown_duration,
            total_buy,
            total_sell,
            return_pct,
            underlying_return_pct,
        }
    }
}

/// Sum of entry and exit prices over closed trades.
fn notional(trades: &[Trade]) -> (f64, f64) {
    trades.iter().fold((0.0, 0.0), |(buy, sell), t| {
        (buy + t.entry_price, sell + t.exit_price)
    })
}

/// Drawdown of a P&L curve that starts flat at zero.
fn compute_drawdown(pnl_curve: &[f64]) -> (f64, usize) {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for &pnl in pnl_curve {
        if pnl >= peak {
            peak = pnl;
            current_duration = 0;
        } else {
            max_dd = max_dd.max(peak - pnl);
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestResult, StepRecord};
    use crate::domain::position::{ExitReason, PositionState};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    fn trade(entry: f64, exit: f64, entry_day: u32, exit_day: u32) -> Trade {
        Trade {
            entry_date: d(entry_day),
            entry_price: entry,
            exit_date: d(exit_day),
            exit_price: exit,
            pnl: exit - entry,
            exit_reason: ExitReason::Signal,
        }
    }

    fn result(trades: Vec<Trade>, pnl_curve: &[f64], closes: (f64, f64)) -> BacktestResult {
        BacktestResult {
            strategy_name: "test".into(),
            final_pnl: trades.iter().map(|t| t.pnl).sum(),
            trade_count: trades.len(),
            trades,
            events: Vec::new(),
            steps: pnl_curve
                .iter()
                .enumerate()
                .map(|(i, &p)| StepRecord {
                    date: d(i as u32 + 1),
                    price: 0.0,
                    position: PositionState::Flat,
                    running_pnl: p,
                })
                .collect(),
            indicators: Vec::new(),
            open_position: None,
            first_close: Some(closes.0),
            last_close: Some(closes.1),
        }
    }

    #[test]
    fn win_loss_statistics() {
        let r = result(
            vec![
                trade(10.0, 14.0, 1, 5),
                trade(12.0, 10.0, 6, 8),
                trade(11.0, 11.0, 9, 10),
                trade(9.0, 15.0, 11, 20),
            ],
            &[],
            (10.0, 15.0),
        );
        let m = Metrics::compute(&r);

        assert_eq!(m.trades_won, 2);
        assert_eq!(m.trades_lost, 1);
        assert_eq!(m.trades_breakeven, 1);
        assert_relative_eq!(m.win_rate, 0.5);
        assert_relative_eq!(m.avg_win, 5.0);
        assert_relative_eq!(m.avg_loss, 2.0);
        assert_relative_eq!(m.largest_win, 6.0);
        assert_relative_eq!(m.largest_loss, 2.0);
        assert_relative_eq!(m.profit_factor, 5.0);
        assert_relative_eq!(m.avg_holding_days, (4 + 2 + 1 + 9) as f64 / 4.0);
    }

    #[test]
    fn return_percentages() {
        let r = result(
            vec![trade(10.0, 12.0, 1, 2), trade(20.0, 19.0, 3, 4)],
            &[],
            (8.0, 10.0),
        );
        let m = Metrics::compute(&r);
        assert_relative_eq!(m.total_buy, 30.0);
        assert_relative_eq!(m.total_sell, 31.0);
        assert_relative_eq!(m.return_pct.unwrap(), 100.0 / 30.0, epsilon = 1e-12);
        assert_relative_eq!(m.underlying_return_pct.unwrap(), 25.0);
    }

    #[test]
    fn no_trades_has_no_return() {
        let m = Metrics::compute(&result(Vec::new(), &[0.0, 0.0], (10.0, 10.0)));
        assert_eq!(m.return_pct, None);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn only_winners_profit_factor_is_infinite() {
        let m = Metrics::compute(&result(vec![trade(1.0, 2.0, 1, 2)], &[], (1.0, 2.0)));
        assert!(m.profit_factor.is_infinite());
    }

    #[test]
    fn drawdown_of_pnl_curve() {
        let (dd, duration) = compute_drawdown(&[0.0, 2.0, 5.0, 1.0, 3.0, 6.0, 4.0]);
        assert_relative_eq!(dd, 4.0);
        assert_eq!(duration, 2);
    }

    #[test]
    fn drawdown_below_zero_from_start() {
        let (dd, duration) = compute_drawdown(&[-1.0, -3.0, -2.0]);
        assert_relative_eq!(dd, 3.0);
        assert_eq!(duration, 3);
    }
}
