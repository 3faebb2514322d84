//! Daily price bar representation.

use chrono::NaiveDate;

/// One trading day for one ticker. Immutable once ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Fractional change from `base` to this bar's close. `None` when `base`
    /// is zero.
    pub fn change_from(&self, base: f64) -> Option<f64> {
        if base == 0.0 {
            None
        } else {
            Some((self.close - base) / base)
        }
    }
}

/// Closing prices in bar order.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
