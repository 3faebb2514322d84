//! Per-ticker analysis pipeline: indicators, signals, backtest.
//!
//! Each ticker runs sequentially; tickers are independent and fan out
//! across the rayon pool. Results come back in input order.

use log::{debug, info};
use rayon::prelude::*;

use crate::domain::backtest::run_backtest;
use crate::domain::indicator_set::{add_indicators, EnrichedBar};
use crate::domain::metrics::{BacktestResult, OverallSummary};
use crate::domain::ohlcv::PriceBar;
use crate::domain::position::Trade;
use crate::domain::signal::{generate_signals, recent_signals, SignaledBar};
use crate::domain::strategy::StrategyConfig;
use crate::domain::universe::LoadedTicker;

#[derive(Debug, Clone)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub enriched: Vec<EnrichedBar>,
    pub signaled: Vec<SignaledBar>,
    pub trades: Vec<Trade>,
    pub result: BacktestResult,
}

impl TickerAnalysis {
    /// The last `count` BUY/SELL bars, oldest first.
    pub fn recent(&self, count: usize) -> Vec<&SignaledBar> {
        recent_signals(&self.signaled, count)
    }
}

pub fn analyze_ticker(ticker: &str, bars: &[PriceBar], config: &StrategyConfig) -> TickerAnalysis {
    let enriched = add_indicators(bars);
    let signaled = generate_signals(&enriched, config);
    let run = run_backtest(&signaled, config);
    debug!(
        "{}: {} bars, {} trades",
        ticker,
        bars.len(),
        run.trades.len()
    );

    TickerAnalysis {
        ticker: ticker.to_string(),
        enriched,
        signaled,
        trades: run.trades,
        result: run.result,
    }
}

pub fn analyze_universe(inputs: &[LoadedTicker], config: &StrategyConfig) -> Vec<TickerAnalysis> {
    inputs
        .par_iter()
        .map(|input| analyze_ticker(&input.ticker, &input.bars, config))
        .collect()
}

/// Fold per-ticker results into one summary on the calling thread.
pub fn summarize(analyses: &[TickerAnalysis], scan_time: &str) -> OverallSummary {
    let mut summary = OverallSummary::new(analyses.len(), scan_time);
    for analysis in analyses {
        summary.absorb(&analysis.result);
    }
    summary
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

pub fn log_signal(ticker: &str, bar: &SignaledBar) {
    info!(
        "Found {} for {} on {} @ {:.2} (RSI={}, SMA20={}, SMA50={})",
        bar.signal,
        ticker,
        bar.bar.date,
        bar.bar.close,
        fmt_opt(bar.indicators.rsi14),
        fmt_opt(bar.indicators.sma20),
        fmt_opt(bar.indicators.sma50),
    );
}

pub fn log_backtest(ticker: &str, result: &BacktestResult) {
    info!(
        "Backtest {} | Trades={} | Wins={} | Net P&L={:.2} | WinRatio={:.2}%",
        ticker, result.total, result.wins, result.net_pnl, result.win_ratio
    );
}
