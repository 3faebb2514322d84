#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::error::SigtraderError;
use sigtrader::domain::features::ClassifierReport;
use sigtrader::domain::metrics::OverallSummary;
pub use sigtrader::domain::ohlcv::PriceBar;
use sigtrader::ports::data_port::DataPort;
use sigtrader::ports::notify_port::Notifier;
use sigtrader::ports::report_port::{SignalRecord, SignalSink};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SigtraderError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, SigtraderError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SigtraderError::Database {
                reason: reason.clone(),
            });
        }
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Sink that keeps everything in memory. `fail_appends` makes every
/// `append_signal` return an error.
#[derive(Default)]
pub struct RecordingSink {
    pub signals: RefCell<Vec<SignalRecord>>,
    pub summaries: RefCell<Vec<OverallSummary>>,
    pub analytics: RefCell<Vec<Vec<ClassifierReport>>>,
    pub fail_appends: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_appends: true,
            ..Self::default()
        }
    }
}

impl SignalSink for RecordingSink {
    fn append_signal(&self, record: &SignalRecord) -> Result<(), SigtraderError> {
        if self.fail_appends {
            return Err(SigtraderError::Io(std::io::Error::other("disk full")));
        }
        self.signals.borrow_mut().push(record.clone());
        Ok(())
    }

    fn write_summary(&self, summary: &OverallSummary) -> Result<(), SigtraderError> {
        self.summaries.borrow_mut().push(summary.clone());
        Ok(())
    }

    fn write_analytics(&self, reports: &[ClassifierReport]) -> Result<(), SigtraderError> {
        self.analytics.borrow_mut().push(reports.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, text: &str) -> Result<(), SigtraderError> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(SigtraderError::Notification {
                reason: "chat unreachable".into(),
            });
        }
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars starting 2024-01-01, one per calendar day, flat OHLC.
pub fn bars_from_closes(ticker: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            ticker: ticker.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// 49 flat bars, a 10% drop (oversold BUY on bar 49), then a recovery to
/// 104.5 that closes the position at its take-profit target on bar 50.
pub fn dip_and_recover_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 49];
    closes.push(90.0);
    closes.extend(std::iter::repeat(104.5).take(10));
    closes
}

pub fn dip_and_recover(ticker: &str) -> Vec<PriceBar> {
    bars_from_closes(ticker, &dip_and_recover_closes())
}

/// Deterministic wave with enough defined feature rows for the classifier.
pub fn wave(ticker: &str, count: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| 100.0 + 10.0 * (i as f64 * 0.3).sin() + (i % 7) as f64 * 0.5)
        .collect();
    let mut bars = bars_from_closes(ticker, &closes);
    for (i, bar) in bars.iter_mut().enumerate() {
        bar.volume = 1000.0 + ((i * 37) % 11) as f64 * 100.0;
    }
    bars
}

pub fn write_csv(dir: &std::path::Path, ticker: &str, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{ticker}.csv")), content).unwrap();
}
