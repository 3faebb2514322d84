//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded at the first defined MACD
//!
//! Default parameters: fast=12, slow=26, signal=9. Both EMAs are seeded
//! with the first close, so every line is defined from the first bar.

use crate::domain::indicator::ema::ema_of_optional;
use crate::domain::indicator::{calculate_ema, IndicatorSeries, IndicatorType};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub indicator_type: IndicatorType,
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

pub fn calculate_macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> MacdSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if fast == 0 || slow == 0 || signal_period == 0 {
        return MacdSeries {
            indicator_type,
            line: vec![None; values.len()],
            signal: vec![None; values.len()],
        };
    }

    let ema_fast = calculate_ema(values, fast);
    let ema_slow = calculate_ema(values, slow);

    let line: Vec<Option<f64>> = ema_fast
        .values
        .iter()
        .zip(&ema_slow.values)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let IndicatorSeries { values: signal, .. } = ema_of_optional(&line, signal_period);

    MacdSeries {
        indicator_type,
        line,
        signal,
    }
}

pub fn calculate_macd_default(values: &[f64]) -> MacdSeries {
    calculate_macd(values, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
