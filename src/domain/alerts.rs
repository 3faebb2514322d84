//! Operator alert text. Delivery is the notifier's job; this module only
//! formats.

use crate::domain::metrics::OverallSummary;
use crate::domain::signal::SignaledBar;

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

pub fn format_signal_alert(ticker: &str, bar: &SignaledBar) -> String {
    format!(
        "{} signal for {} on {} at {:.2}\nRSI={}, SMA20={}, SMA50={}",
        bar.signal,
        ticker,
        bar.bar.date,
        bar.bar.close,
        fmt_opt(bar.indicators.rsi14),
        fmt_opt(bar.indicators.sma20),
        fmt_opt(bar.indicators.sma50),
    )
}

pub fn format_summary_alert(summary: &OverallSummary) -> String {
    format!(
        "*Trading Summary Report*\n\n\
         Total Trades: {}\n\
         Wins: {}\n\
         Losses: {}\n\
         Net P&L: {:.2}\n\
         Win Ratio: {:.2}%",
        summary.total_trades,
        summary.wins,
        summary.losses,
        summary.net_pnl,
        summary.win_ratio(),
    )
}

/// `time` is rendered as given; callers pass a local timestamp.
pub fn format_error_alert(error: &str, time: &str) -> String {
    format!("*System Error Alert*\n\nError: {error}\nTime: {time}")
}
