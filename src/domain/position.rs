//! Position state, closed trades and buy/sell events.

use std::fmt;

use chrono::NaiveDate;

/// Unit position: at most one long position, no shorting, no sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Long => write!(f, "LONG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    TrailingStop,
    /// Force-closed at the last price when the history ran out.
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::TrailingStop => write!(f, "trailing_stop"),
            ExitReason::EndOfData => write!(f, "end_of_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub high_water_mark: f64,
}

impl OpenPosition {
    pub fn open(date: NaiveDate, price: f64) -> Self {
        Self {
            entry_date: date,
            entry_price: price,
            high_water_mark: price,
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        price - self.entry_price
    }

    /// Price at or below which the trailing stop fires.
    pub fn stop_level(&self, fraction: f64) -> f64 {
        self.high_water_mark * (1.0 - fraction)
    }

    pub fn should_stop(&self, price: f64, fraction: f64) -> bool {
        price <= self.stop_level(fraction)
    }

    pub fn close(&self, date: NaiveDate, price: f64, reason: ExitReason) -> Trade {
        Trade {
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date: date,
            exit_price: price,
            pnl: price - self.entry_price,
            exit_reason: reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub price: f64,
    pub side: Side,
    /// Set on sells only.
    pub reason: Option<ExitReason>,
}

impl TradeEvent {
    pub fn buy(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            price,
            side: Side::Buy,
            reason: None,
        }
    }

    pub fn sell(date: NaiveDate, price: f64, reason: ExitReason) -> Self {
        Self {
            date,
            price,
            side: Side::Sell,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn open_sets_high_water_mark_to_entry() {
        let pos = OpenPosition::open(d(2), 50.0);
        assert_eq!(pos.entry_price, 50.0);
        assert_eq!(pos.high_water_mark, 50.0);
    }

    #[test]
    fn unrealized_pnl_is_price_difference() {
        let pos = OpenPosition::open(d(2), 50.0);
        assert!((pos.unrealized_pnl(55.0) - 5.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) + 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trailing_stop_fires_at_level() {
        let mut pos = OpenPosition::open(d(2), 100.0);
        pos.high_water_mark = 120.0;
        assert!((pos.stop_level(0.05) - 114.0).abs() < 1e-9);
        assert!(pos.should_stop(113.9, 0.05));
        assert!(pos.should_stop(100.0, 0.05));
        assert!(!pos.should_stop(114.5, 0.05));
    }

    #[test]
    fn close_realizes_trade() {
        let pos = OpenPosition::open(d(2), 50.0);
        let trade = pos.close(d(9), 47.5, ExitReason::TrailingStop);
        assert_eq!(trade.entry_date, d(2));
        assert_eq!(trade.exit_date, d(9));
        assert!((trade.pnl + 2.5).abs() < f64::EPSILON);
        assert!(!trade.is_win());
        assert_eq!(trade.holding_days(), 7);
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
    }

    #[test]
    fn event_constructors() {
        let buy = TradeEvent::buy(d(1), 10.0);
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.reason, None);

        let sell = TradeEvent::sell(d(3), 12.0, ExitReason::Signal);
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.reason, Some(ExitReason::Signal));
    }

    #[test]
    fn display_forms() {
        assert_eq!(PositionState::default().to_string(), "FLAT");
        assert_eq!(Side::Sell.to_string(), "SELL");
        assert_eq!(ExitReason::EndOfData.to_string(), "end_of_data");
    }
}
