//! Strategy parameters consumed by the signal generator and the backtest
//! simulator.

pub const DEFAULT_MAX_HOLD_DAYS: i64 = 20;
pub const DEFAULT_RECENT_SIGNAL_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Calendar days after which an open position is closed.
    pub max_hold_days: i64,
    /// Percent move from entry that triggers a stop loss (negative).
    pub stop_loss_pct: f64,
    /// Percent move from entry that triggers a take profit (positive).
    pub take_profit_pct: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_buy_crossover_threshold: f64,
    pub rsi_buy_volume_threshold: f64,
    pub volume_spike_multiplier: f64,
    pub reversal_lookback_days: usize,
    /// Fractional 5-day change below which a reversal is flagged.
    pub reversal_pct_threshold: f64,
    /// Number of most recent BUY/SELL bars a scan reports.
    pub recent_signal_count: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_hold_days: DEFAULT_MAX_HOLD_DAYS,
            stop_loss_pct: -5.0,
            take_profit_pct: 10.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_buy_crossover_threshold: 36.0,
            rsi_buy_volume_threshold: 42.0,
            volume_spike_multiplier: 1.3,
            reversal_lookback_days: 5,
            reversal_pct_threshold: -0.03,
            recent_signal_count: DEFAULT_RECENT_SIGNAL_COUNT,
        }
    }
}

impl StrategyConfig {
    /// Bars of history needed before every rule input can be defined.
    pub fn min_history_bars(&self) -> usize {
        crate::domain::indicator_set::SMA_SLOW
            .max(self.reversal_lookback_days + 1)
            .max(self.max_hold_days.max(0) as usize)
    }
}
