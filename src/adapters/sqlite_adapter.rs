//! SQLite adapter: price history source and scan output sink.

use crate::domain::error::SigtraderError;
use crate::domain::features::ClassifierReport;
use crate::domain::metrics::OverallSummary;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{SignalRecord, SignalSink};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn query_err(e: rusqlite::Error) -> SigtraderError {
    SigtraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, SigtraderError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| SigtraderError::Database {
        reason: format!("invalid stored date '{}': {}", value, e),
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Data source configured by `[sqlite] path` and `pool_size`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SigtraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| SigtraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).clamp(1, 64) as u32;
        Self::open(&db_path, pool_size)
    }

    pub fn open(db_path: &str, pool_size: u32) -> Result<Self, SigtraderError> {
        let manager = SqliteConnectionManager::file(db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| SigtraderError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SigtraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SigtraderError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, SigtraderError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| SigtraderError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), SigtraderError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bars (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (ticker, date)
            );
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                ticker TEXT NOT NULL,
                signal TEXT NOT NULL,
                price REAL NOT NULL,
                rsi REAL,
                sma20 REAL,
                sma50 REAL,
                volume REAL NOT NULL,
                macd REAL,
                macd_signal REAL,
                notes TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS summary (
                metric TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS analytics (
                ticker TEXT PRIMARY KEY,
                accuracy REAL NOT NULL,
                train_samples INTEGER NOT NULL,
                test_samples INTEGER NOT NULL,
                prediction TEXT,
                up_probability REAL,
                down_probability REAL
            );
            CREATE INDEX IF NOT EXISTS idx_signals_ticker ON signals(ticker);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    pub fn insert_bars(&self, bars: &[PriceBar]) -> Result<(), SigtraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO bars (ticker, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.ticker,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    /// Every stored signal row for `ticker`, oldest insert first.
    pub fn signals_for(&self, ticker: &str) -> Result<Vec<SignalRecord>, SigtraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, ticker, signal, price, rsi, sma20, sma50, volume, macd,
                        macd_signal, notes
                 FROM signals WHERE ticker = ?1 ORDER BY id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![ticker], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                let signal: String = row.get(2)?;
                Ok(SignalRecord {
                    date,
                    ticker: row.get(1)?,
                    signal: match signal.as_str() {
                        "BUY" => Signal::Buy,
                        "SELL" => Signal::Sell,
                        _ => Signal::None,
                    },
                    price: row.get(3)?,
                    rsi: row.get(4)?,
                    sma20: row.get(5)?,
                    sma50: row.get(6)?,
                    volume: row.get(7)?,
                    macd: row.get(8)?,
                    macd_signal: row.get(9)?,
                    notes: row.get(10)?,
                })
            })
            .map_err(query_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_err)?);
        }
        Ok(records)
    }

    pub fn summary_value(&self, metric: &str) -> Result<Option<String>, SigtraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT value FROM summary WHERE metric = ?1")
            .map_err(query_err)?;
        let mut rows = stmt.query(params![metric]).map_err(query_err)?;
        match rows.next().map_err(query_err)? {
            Some(row) => Ok(Some(row.get(0).map_err(query_err)?)),
            None => Ok(None),
        }
    }

    pub fn analytics_count(&self) -> Result<usize, SigtraderError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM analytics", [], |row| row.get(0))
            .map_err(query_err)?;
        Ok(count as usize)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        let conn = self.conn()?;

        let start_str = start_date.format(DATE_FORMAT).to_string();
        let end_str = end_date.format(DATE_FORMAT).to_string();

        let query = "SELECT ticker, date, open, high, low, close, volume
                     FROM bars
                     WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                     ORDER BY date ASC";

        let mut stmt = conn.prepare(query).map_err(query_err)?;

        let rows = stmt
            .query_map(params![ticker, start_str, end_str], |row| {
                let date_str: String = row.get(1)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(PriceBar {
                    ticker: row.get(0)?,
                    date,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }

        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SigtraderError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT ticker FROM bars ORDER BY ticker")
            .map_err(query_err)?;

        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;

        let mut tickers = Vec::new();
        for row in rows {
            tickers.push(row.map_err(query_err)?);
        }

        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        let conn = self.conn()?;

        let query = "SELECT MIN(date), MAX(date), COUNT(*) FROM bars WHERE ticker = ?1";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![ticker], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => Ok(Some((
                parse_date(&min_str)?,
                parse_date(&max_str)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }
}

impl SignalSink for SqliteAdapter {
    fn append_signal(&self, record: &SignalRecord) -> Result<(), SigtraderError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals (date, ticker, signal, price, rsi, sma20, sma50, volume,
                                  macd, macd_signal, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.date.format(DATE_FORMAT).to_string(),
                record.ticker,
                record.signal.as_str(),
                record.price,
                record.rsi,
                record.sma20,
                record.sma50,
                record.volume,
                record.macd,
                record.macd_signal,
                record.notes
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn write_summary(&self, summary: &OverallSummary) -> Result<(), SigtraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute("DELETE FROM summary", []).map_err(query_err)?;
        for (metric, value) in summary.rows() {
            tx.execute(
                "INSERT INTO summary (metric, value) VALUES (?1, ?2)",
                params![metric, value],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn write_analytics(&self, reports: &[ClassifierReport]) -> Result<(), SigtraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute("DELETE FROM analytics", []).map_err(query_err)?;
        for report in reports {
            tx.execute(
                "INSERT OR REPLACE INTO analytics (ticker, accuracy, train_samples, test_samples,
                                                   prediction, up_probability, down_probability)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    report.ticker,
                    report.accuracy,
                    report.train_samples as i64,
                    report.test_samples as i64,
                    report.prediction.map(|p| p.direction.to_string()),
                    report.prediction.map(|p| p.up_probability),
                    report.prediction.map(|p| p.down_probability)
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::Prediction;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn bar(ticker: &str, day: u32, close: f64) -> PriceBar {
        PriceBar {
            ticker: ticker.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteAdapter::from_config(&EmptyConfig);
        match result {
            Err(SigtraderError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn in_memory_initialization_is_idempotent() {
        let adapter = adapter();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn fetch_bars_returns_ordered_range() {
        let adapter = adapter();
        adapter
            .insert_bars(&[
                bar("TCS.NS", 3, 102.0),
                bar("TCS.NS", 1, 100.0),
                bar("TCS.NS", 2, 101.0),
                bar("INFY.NS", 1, 50.0),
            ])
            .unwrap();

        let fetched = adapter
            .fetch_bars(
                "TCS.NS",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            )
            .unwrap();

        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].ticker, "TCS.NS");
        assert_eq!(fetched[0].close, 100.0);
        assert_eq!(fetched[1].close, 101.0);
    }

    #[test]
    fn insert_replaces_same_date() {
        let adapter = adapter();
        adapter.insert_bars(&[bar("TCS.NS", 1, 100.0)]).unwrap();
        adapter.insert_bars(&[bar("TCS.NS", 1, 105.0)]).unwrap();

        let range = adapter.get_data_range("TCS.NS").unwrap();
        assert_eq!(range.map(|r| r.2), Some(1));
    }

    #[test]
    fn list_tickers_distinct_sorted() {
        let adapter = adapter();
        adapter
            .insert_bars(&[
                bar("TCS.NS", 1, 100.0),
                bar("INFY.NS", 1, 50.0),
                bar("TCS.NS", 2, 101.0),
            ])
            .unwrap();

        assert_eq!(adapter.list_tickers().unwrap(), vec!["INFY.NS", "TCS.NS"]);
    }

    #[test]
    fn data_range_bounds() {
        let adapter = adapter();
        adapter
            .insert_bars(&[bar("TCS.NS", 1, 100.0), bar("TCS.NS", 5, 102.0)])
            .unwrap();

        let (min, max, count) = adapter.get_data_range("TCS.NS").unwrap().unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(count, 2);
        assert!(adapter.get_data_range("MISSING").unwrap().is_none());
    }

    #[test]
    fn signals_round_trip_with_missing_values() {
        let adapter = adapter();
        let record = SignalRecord {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ticker: "TCS.NS".into(),
            signal: Signal::Buy,
            price: 3500.0,
            rsi: Some(25.0),
            sma20: None,
            sma50: None,
            volume: 10_000.0,
            macd: Some(-1.5),
            macd_signal: Some(-1.0),
            notes: "scan".into(),
        };
        adapter.append_signal(&record).unwrap();
        adapter.append_signal(&record).unwrap();

        let stored = adapter.signals_for("TCS.NS").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], record);
    }

    #[test]
    fn summary_and_analytics_are_replaced() {
        let adapter = adapter();
        adapter
            .write_summary(&OverallSummary::new(2, "first"))
            .unwrap();
        adapter
            .write_summary(&OverallSummary::new(5, "second"))
            .unwrap();
        assert_eq!(
            adapter.summary_value("Total Tickers").unwrap(),
            Some("5".to_string())
        );
        assert_eq!(
            adapter.summary_value("Scan Time").unwrap(),
            Some("second".to_string())
        );

        let report = |ticker: &str| ClassifierReport {
            ticker: ticker.into(),
            train_samples: 40,
            test_samples: 10,
            accuracy: 0.6,
            prediction: Some(Prediction::from_up_probability(0.8)),
        };
        adapter
            .write_analytics(&[report("A"), report("B")])
            .unwrap();
        adapter.write_analytics(&[report("C")]).unwrap();
        assert_eq!(adapter.analytics_count().unwrap(), 1);
    }
}
