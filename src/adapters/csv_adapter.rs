//! CSV file data adapter: one `{TICKER}.csv` per ticker with header
//! `date,open,high,low,close,volume`.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use log::warn;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    /// Every well-formed bar in the ticker's file, sorted by date with
    /// duplicate dates collapsed to their first occurrence.
    fn read_all(&self, ticker: &str) -> Result<Vec<PriceBar>, SigtraderError> {
        let path = self.csv_path(ticker);
        let file = fs::File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SigtraderError::NoData {
                ticker: ticker.to_string(),
            },
            _ => SigtraderError::Io(e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "{}: dropping unreadable row {} ({})",
                        path.display(),
                        line + 2,
                        e
                    );
                    continue;
                }
            };
            match parse_record(ticker, &record) {
                Some(bar) => bars.push(bar),
                None => warn!(
                    "{}: dropping malformed row {} ({:?})",
                    path.display(),
                    line + 2,
                    record.iter().collect::<Vec<_>>()
                ),
            }
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }
}

fn parse_record(ticker: &str, record: &StringRecord) -> Option<PriceBar> {
    let field = |i: usize| record.get(i).filter(|s| !s.is_empty());
    let number = |i: usize| field(i)?.parse::<f64>().ok().filter(|v| v.is_finite());

    Some(PriceBar {
        ticker: ticker.to_string(),
        date: NaiveDate::parse_from_str(field(0)?, "%Y-%m-%d").ok()?,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        let mut bars = self.read_all(ticker)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(".csv") {
                if !ticker.is_empty() {
                    tickers.push(ticker.to_string());
                }
            }
        }

        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        let bars = match self.read_all(ticker) {
            Ok(bars) => bars,
            Err(SigtraderError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
