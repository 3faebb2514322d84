//! Backtest simulator: single-position state machine over signaled bars.
//!
//! FLAT --BUY--> LONG opens at the bar's close. While LONG, each bar checks
//! the exit conditions in fixed priority and the first match closes the
//! position at the bar's close:
//!
//! 1. signal == SELL            -> SELL_SIGNAL
//! 2. RSI > overbought          -> RSI_OVERBOUGHT
//! 3. change <= stop_loss_pct   -> STOP_LOSS
//! 4. change >= take_profit_pct -> TAKE_PROFIT
//! 5. days_held >= max_hold     -> MAX_DAYS
//!
//! A position still open after the last bar is unrealized and dropped.

use crate::domain::metrics::BacktestResult;
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::signal::{Signal, SignaledBar};
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    Flat,
    Long(Position),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub trades: Vec<Trade>,
    pub result: BacktestResult,
}

pub fn run_backtest(signaled: &[SignaledBar], config: &StrategyConfig) -> BacktestRun {
    let mut trades: Vec<Trade> = Vec::new();
    let mut state = PositionState::Flat;

    for bar in signaled {
        state = match state {
            PositionState::Flat => {
                if bar.signal == Signal::Buy {
                    PositionState::Long(Position {
                        entry_date: bar.bar.date,
                        entry_price: bar.bar.close,
                        entry_rsi: bar.indicators.rsi14,
                    })
                } else {
                    PositionState::Flat
                }
            }
            PositionState::Long(position) => match exit_reason(&position, bar, config) {
                Some(reason) => {
                    trades.push(position.close(bar.bar.date, bar.bar.close, reason));
                    PositionState::Flat
                }
                None => PositionState::Long(position),
            },
        };
    }

    let result = BacktestResult::from_trades(&trades);
    BacktestRun { trades, result }
}

/// First exit condition met by `bar` for the open `position`, if any.
pub fn exit_reason(
    position: &Position,
    bar: &SignaledBar,
    config: &StrategyConfig,
) -> Option<ExitReason> {
    let change_pct = position.change_pct(bar.bar.close);
    let days_held = position.days_held(bar.bar.date);

    if bar.signal == Signal::Sell {
        Some(ExitReason::SellSignal)
    } else if bar
        .indicators
        .rsi14
        .is_some_and(|rsi| rsi > config.rsi_overbought)
    {
        Some(ExitReason::RsiOverbought)
    } else if change_pct <= config.stop_loss_pct {
        Some(ExitReason::StopLoss)
    } else if change_pct >= config.take_profit_pct {
        Some(ExitReason::TakeProfit)
    } else if days_held >= config.max_hold_days {
        Some(ExitReason::MaxDays)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator_set::IndicatorSet;
    use crate::domain::ohlcv::PriceBar;
    use crate::domain::signal::RuleInputs;
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn sbar(offset: i64, close: f64, signal: Signal, rsi: Option<f64>) -> SignaledBar {
        SignaledBar {
            bar: PriceBar {
                ticker: "TEST".into(),
                date: day(offset),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            },
            indicators: IndicatorSet {
                rsi14: rsi,
                ..IndicatorSet::default()
            },
            inputs: RuleInputs::default(),
            signal,
        }
    }

    fn quiet(offset: i64, close: f64) -> SignaledBar {
        sbar(offset, close, Signal::None, Some(50.0))
    }

    #[test]
    fn empty_series_no_trades() {
        let run = run_backtest(&[], &StrategyConfig::default());
        assert!(run.trades.is_empty());
        assert_eq!(run.result.total, 0);
        assert_eq!(run.result.win_ratio, 0.0);
    }

    #[test]
    fn buy_then_sell_signal() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            quiet(1, 101.0),
            sbar(2, 103.0, Signal::Sell, Some(60.0)),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());

        assert_eq!(run.trades.len(), 1);
        let t = &run.trades[0];
        assert_eq!(t.entry_date, day(0));
        assert_eq!(t.exit_date, day(2));
        assert_eq!(t.exit_reason, ExitReason::SellSignal);
        assert!((t.pnl - 3.0).abs() < 1e-9);
        assert_eq!(t.days_held, 2);
    }

    #[test]
    fn stop_loss_exactly_minus_five() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            quiet(1, 97.0),
            quiet(2, 95.0),
            quiet(3, 90.0),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());

        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(run.trades[0].exit_date, day(2));
        assert!((run.trades[0].exit_price - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn take_profit_exactly_plus_ten() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            quiet(1, 105.0),
            quiet(2, 110.0),
            quiet(3, 120.0),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());

        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(run.trades[0].exit_date, day(2));
    }

    #[test]
    fn max_days_on_exact_bar() {
        let config = StrategyConfig::default();
        let mut bars = vec![sbar(0, 100.0, Signal::Buy, Some(25.0))];
        for d in 1..=25 {
            bars.push(quiet(d, 101.0));
        }
        let run = run_backtest(&bars, &config);

        assert_eq!(run.trades.len(), 1);
        let t = &run.trades[0];
        assert_eq!(t.exit_reason, ExitReason::MaxDays);
        assert_eq!(t.days_held, config.max_hold_days);
        assert_eq!(t.exit_date, day(config.max_hold_days));
    }

    #[test]
    fn rsi_overbought_exit() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            sbar(1, 102.0, Signal::None, Some(75.0)),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert_eq!(run.trades[0].exit_reason, ExitReason::RsiOverbought);
    }

    #[test]
    fn undefined_rsi_is_not_overbought() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            sbar(1, 102.0, Signal::None, None),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert!(run.trades.is_empty());
    }

    #[test]
    fn priority_sell_signal_over_stop_loss() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            sbar(1, 80.0, Signal::Sell, Some(80.0)),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].exit_reason, ExitReason::SellSignal);
    }

    #[test]
    fn priority_overbought_over_take_profit() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            sbar(1, 130.0, Signal::None, Some(85.0)),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert_eq!(run.trades[0].exit_reason, ExitReason::RsiOverbought);
    }

    #[test]
    fn priority_stop_loss_over_max_days() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            quiet(30, 90.0),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert_eq!(run.trades[0].exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn additional_buys_while_long_are_ignored() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            sbar(1, 99.0, Signal::Buy, Some(22.0)),
            sbar(2, 98.0, Signal::Buy, Some(20.0)),
            sbar(3, 103.0, Signal::Sell, Some(60.0)),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());

        assert_eq!(run.trades.len(), 1);
        assert!((run.trades[0].entry_price - 100.0).abs() < f64::EPSILON);
        assert_eq!(run.trades[0].entry_date, day(0));
    }

    #[test]
    fn exit_bar_buy_does_not_reopen() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            sbar(1, 111.0, Signal::Buy, Some(28.0)),
            sbar(2, 112.0, Signal::None, Some(50.0)),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].exit_reason, ExitReason::TakeProfit);
    }

    #[test]
    fn open_position_at_end_is_dropped() {
        let bars = vec![
            sbar(0, 100.0, Signal::Sell, Some(75.0)),
            sbar(1, 100.0, Signal::Buy, Some(25.0)),
            quiet(2, 101.0),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert!(run.trades.is_empty());
        assert_eq!(run.result.total, 0);
    }

    #[test]
    fn sell_while_flat_is_ignored() {
        let bars = vec![
            sbar(0, 100.0, Signal::Sell, Some(75.0)),
            quiet(1, 100.0),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert!(run.trades.is_empty());
    }

    #[test]
    fn custom_thresholds() {
        let config = StrategyConfig {
            stop_loss_pct: -2.0,
            take_profit_pct: 3.0,
            max_hold_days: 5,
            ..StrategyConfig::default()
        };
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            quiet(1, 98.0),
            sbar(2, 100.0, Signal::Buy, Some(25.0)),
            quiet(3, 103.0),
        ];
        let run = run_backtest(&bars, &config);
        assert_eq!(run.trades.len(), 2);
        assert_eq!(run.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(run.trades[1].exit_reason, ExitReason::TakeProfit);
    }

    #[test]
    fn result_aggregates_ledger() {
        let bars = vec![
            sbar(0, 100.0, Signal::Buy, Some(25.0)),
            quiet(1, 112.0),
            sbar(2, 100.0, Signal::Buy, Some(25.0)),
            quiet(3, 94.0),
        ];
        let run = run_backtest(&bars, &StrategyConfig::default());
        assert_eq!(run.result.total, 2);
        assert_eq!(run.result.wins, 1);
        assert_eq!(run.result.losses, 1);
        assert!((run.result.net_pnl - 6.0).abs() < 1e-9);
    }
}
