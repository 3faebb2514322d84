//! Data access port trait.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `ticker` within `[start_date, end_date]`, oldest first.
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError>;

    fn list_tickers(&self) -> Result<Vec<String>, SigtraderError>;

    /// First date, last date and bar count, or `None` if the ticker is unknown.
    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError>;
}
