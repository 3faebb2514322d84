//! Performance statistics over a trade ledger, per ticker and across a scan.

use crate::domain::position::Trade;

/// Aggregate statistics over one ticker's trade ledger.
///
/// `losses` is `total - wins`, so break-even trades count as losses, while
/// `avg_loss` only averages trades with negative pnl.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    pub net_pnl: f64,
    /// Percent of trades with positive pnl.
    pub win_ratio: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
}

impl BacktestResult {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let total = trades.len();
        let mut wins = 0usize;
        let mut negatives = 0usize;
        let mut net_pnl = 0.0_f64;
        let mut win_pnl = 0.0_f64;
        let mut loss_pnl = 0.0_f64;

        for trade in trades {
            net_pnl += trade.pnl;
            if trade.pnl > 0.0 {
                wins += 1;
                win_pnl += trade.pnl;
            } else if trade.pnl < 0.0 {
                negatives += 1;
                loss_pnl += trade.pnl;
            }
        }

        BacktestResult {
            total,
            wins,
            losses: total - wins,
            net_pnl,
            win_ratio: ratio(wins as f64 * 100.0, total),
            avg_pnl: ratio(net_pnl, total),
            avg_win: ratio(win_pnl, wins),
            avg_loss: ratio(loss_pnl, negatives),
        }
    }
}

fn ratio(numerator: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}

/// Running totals across every ticker of a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverallSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub net_pnl: f64,
    pub total_tickers: usize,
    pub scan_time: String,
}

impl OverallSummary {
    pub fn new(total_tickers: usize, scan_time: impl Into<String>) -> Self {
        Self {
            total_tickers,
            scan_time: scan_time.into(),
            ..Self::default()
        }
    }

    pub fn absorb(&mut self, result: &BacktestResult) {
        self.total_trades += result.total;
        self.wins += result.wins;
        self.losses += result.losses;
        self.net_pnl += result.net_pnl;
    }

    pub fn win_ratio(&self) -> f64 {
        ratio(self.wins as f64 * 100.0, self.total_trades)
    }

    pub fn avg_pnl(&self) -> f64 {
        ratio(self.net_pnl, self.total_trades)
    }

    /// Metric/value rows in display order, values formatted for output.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Trades", self.total_trades.to_string()),
            ("Wins", self.wins.to_string()),
            ("Losses", self.losses.to_string()),
            ("Net P&L", format!("{:.2}", self.net_pnl)),
            ("Total Tickers", self.total_tickers.to_string()),
            ("Scan Time", self.scan_time.clone()),
            ("Win Ratio (%)", format!("{:.2}", self.win_ratio())),
            ("Avg P&L per Trade", format!("{:.2}", self.avg_pnl())),
        ]
    }
}
