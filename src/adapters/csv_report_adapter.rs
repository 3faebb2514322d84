//! CSV output sink: `trade_log.csv` (appended), `summary.csv` and
//! `analytics.csv` (rewritten on every write).

use crate::domain::error::SigtraderError;
use crate::domain::features::ClassifierReport;
use crate::domain::metrics::OverallSummary;
use crate::ports::report_port::{SignalRecord, SignalSink};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const TRADE_LOG_FILE: &str = "trade_log.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const ANALYTICS_FILE: &str = "analytics.csv";

const SUMMARY_HEADER: [&str; 2] = ["metric", "value"];
const ANALYTICS_HEADER: [&str; 7] = [
    "ticker",
    "accuracy",
    "train_samples",
    "test_samples",
    "prediction",
    "up_probability",
    "down_probability",
];

#[derive(Debug, Serialize)]
struct SignalRow<'a> {
    date: String,
    ticker: &'a str,
    signal: &'static str,
    price: String,
    rsi: String,
    sma20: String,
    sma50: String,
    volume: String,
    macd: String,
    macd_signal: String,
    notes: &'a str,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    metric: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyticsRow<'a> {
    ticker: &'a str,
    accuracy: String,
    train_samples: usize,
    test_samples: usize,
    prediction: String,
    up_probability: String,
    down_probability: String,
}

fn num(value: f64) -> String {
    format!("{:.4}", value)
}

fn opt(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

pub struct CsvReportAdapter {
    dir: PathBuf,
}

impl CsvReportAdapter {
    /// Creates `dir` if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SigtraderError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Replace `path` with `rows`. `header` is written explicitly only when
    /// there are no rows to derive it from.
    fn rewrite<T: Serialize>(
        &self,
        path: &Path,
        header: &[&str],
        rows: &[T],
    ) -> Result<(), SigtraderError> {
        let mut wtr = csv::Writer::from_path(path)?;
        if rows.is_empty() {
            wtr.write_record(header)?;
        }
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl SignalSink for CsvReportAdapter {
    fn append_signal(&self, record: &SignalRecord) -> Result<(), SigtraderError> {
        let path = self.path(TRADE_LOG_FILE);
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(SignalRow {
            date: record.date.to_string(),
            ticker: &record.ticker,
            signal: record.signal.as_str(),
            price: num(record.price),
            rsi: opt(record.rsi),
            sma20: opt(record.sma20),
            sma50: opt(record.sma50),
            volume: num(record.volume),
            macd: opt(record.macd),
            macd_signal: opt(record.macd_signal),
            notes: &record.notes,
        })?;
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(&self, summary: &OverallSummary) -> Result<(), SigtraderError> {
        let rows = summary.rows();
        let rows: Vec<SummaryRow> = rows
            .iter()
            .map(|(metric, value)| SummaryRow {
                metric,
                value: value.as_str(),
            })
            .collect();
        self.rewrite(&self.path(SUMMARY_FILE), &SUMMARY_HEADER, &rows)
    }

    fn write_analytics(&self, reports: &[ClassifierReport]) -> Result<(), SigtraderError> {
        let rows: Vec<AnalyticsRow> = reports
            .iter()
            .map(|r| AnalyticsRow {
                ticker: &r.ticker,
                accuracy: num(r.accuracy),
                train_samples: r.train_samples,
                test_samples: r.test_samples,
                prediction: r
                    .prediction
                    .map(|p| p.direction.to_string())
                    .unwrap_or_default(),
                up_probability: opt(r.prediction.map(|p| p.up_probability)),
                down_probability: opt(r.prediction.map(|p| p.down_probability)),
            })
            .collect();
        self.rewrite(&self.path(ANALYTICS_FILE), &ANALYTICS_HEADER, &rows)
    }
}
