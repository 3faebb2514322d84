//! Open position and closed trade records.

use std::fmt;

use chrono::NaiveDate;

/// A long position held by the simulator. At most one exists at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub entry_rsi: Option<f64>,
}

impl Position {
    /// Calendar days between entry and `date`.
    pub fn days_held(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }

    /// Percent move from entry to `price`.
    pub fn change_pct(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * 100.0
    }

    /// Close the position at `price` on `date`.
    pub fn close(self, date: NaiveDate, price: f64, exit_reason: ExitReason) -> Trade {
        let pnl = price - self.entry_price;
        Trade {
            entry_date: self.entry_date,
            exit_date: date,
            entry_price: self.entry_price,
            exit_price: price,
            pnl,
            pnl_pct: pnl / self.entry_price * 100.0,
            days_held: self.days_held(date),
            exit_reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    SellSignal,
    RsiOverbought,
    StopLoss,
    TakeProfit,
    MaxDays,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::SellSignal => "SELL_SIGNAL",
            ExitReason::RsiOverbought => "RSI_OVERBOUGHT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::MaxDays => "MAX_DAYS",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub days_held: i64,
    pub exit_reason: ExitReason,
}
