//! Output sink port trait.

use chrono::NaiveDate;

use crate::domain::error::SigtraderError;
use crate::domain::features::ClassifierReport;
use crate::domain::metrics::OverallSummary;
use crate::domain::signal::{Signal, SignaledBar};

/// One reported BUY/SELL bar. Undefined indicators stay `None` and are
/// written empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub signal: Signal,
    pub price: f64,
    pub rsi: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub volume: f64,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub notes: String,
}

impl SignalRecord {
    pub fn from_bar(ticker: &str, bar: &SignaledBar, notes: impl Into<String>) -> Self {
        Self {
            date: bar.bar.date,
            ticker: ticker.to_string(),
            signal: bar.signal,
            price: bar.bar.close,
            rsi: bar.indicators.rsi14,
            sma20: bar.indicators.sma20,
            sma50: bar.indicators.sma50,
            volume: bar.bar.volume,
            macd: bar.indicators.macd,
            macd_signal: bar.indicators.macd_signal,
            notes: notes.into(),
        }
    }
}

/// Destination for scan output. Created once by the caller and shared by
/// every ticker of a scan.
pub trait SignalSink {
    fn append_signal(&self, record: &SignalRecord) -> Result<(), SigtraderError>;

    /// Replaces any previously written summary.
    fn write_summary(&self, summary: &OverallSummary) -> Result<(), SigtraderError>;

    /// Replaces any previously written analytics rows.
    fn write_analytics(&self, reports: &[ClassifierReport]) -> Result<(), SigtraderError>;
}
