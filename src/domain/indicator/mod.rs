//! Technical indicator implementations.
//!
//! Every indicator maps an ordered input series to an output series of the
//! same length. A value is `None` until the indicator's required window of
//! preceding inputs exists; undefined values propagate and are never
//! replaced by zero.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, calculate_macd_default, MacdSeries};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn undefined(indicator_type: IndicatorType, len: usize) -> Self {
        Self {
            indicator_type,
            values: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`; `None` when undefined or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}
