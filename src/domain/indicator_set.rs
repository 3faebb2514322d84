//! Indicator engine: enriches a price-bar sequence with the indicator set
//! the signal rules read.
//!
//! All indicators are computed over the entire series handed in. Callers
//! that want a shorter window slice the enriched output; they never
//! recompute on a truncated input.

use crate::domain::indicator::{calculate_macd_default, calculate_rsi, calculate_sma, rsi};
use crate::domain::ohlcv::{closes, PriceBar};

pub const SMA_FAST: usize = 20;
pub const SMA_SLOW: usize = 50;

/// Indicator values attached to one bar. `None` means undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSet {
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub rsi14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub sma_diff: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBar {
    pub bar: PriceBar,
    pub indicators: IndicatorSet,
}

pub fn add_indicators(bars: &[PriceBar]) -> Vec<EnrichedBar> {
    let closes = closes(bars);
    let sma20 = calculate_sma(&closes, SMA_FAST);
    let sma50 = calculate_sma(&closes, SMA_SLOW);
    let rsi14 = calculate_rsi(&closes, rsi::DEFAULT_PERIOD);
    let macd = calculate_macd_default(&closes);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let fast = sma20.get(i);
            let slow = sma50.get(i);
            EnrichedBar {
                bar: bar.clone(),
                indicators: IndicatorSet {
                    sma20: fast,
                    sma50: slow,
                    rsi14: rsi14.get(i),
                    macd: macd.line[i],
                    macd_signal: macd.signal[i],
                    sma_diff: fast.zip(slow).map(|(f, s)| f - s),
                },
            }
        })
        .collect()
}
