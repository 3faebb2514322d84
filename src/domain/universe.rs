//! Ticker universe: parses ticker lists from configuration, loads each
//! ticker's history through a [`DataPort`] and rejects histories the core
//! should not see.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::warn;
use std::collections::HashSet;

pub const MIN_HISTORY_BARS: usize = 50;
pub const DEFAULT_TICKERS: &str = "TCS.NS,RELIANCE.NS,INFY.NS";

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

/// Checks a history is usable: non-empty, at least `minimum` bars, dates
/// strictly ascending.
pub fn validate_history(
    ticker: &str,
    bars: &[PriceBar],
    minimum: usize,
) -> Result<(), SigtraderError> {
    if bars.is_empty() {
        return Err(SigtraderError::NoData {
            ticker: ticker.to_string(),
        });
    }

    if bars.len() < minimum {
        return Err(SigtraderError::InsufficientData {
            ticker: ticker.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(SigtraderError::InvalidHistory {
            ticker: ticker.to_string(),
            reason: format!("{} does not follow {}", w[1].date, w[0].date),
        });
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct LoadedTicker {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

#[derive(Debug, Clone)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct UniverseLoad {
    pub loaded: Vec<LoadedTicker>,
    pub skipped: Vec<SkippedTicker>,
}

/// Fetch and validate every ticker. Failures skip the ticker; they never
/// abort the load.
pub fn load_universe(
    data_port: &dyn DataPort,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    minimum: usize,
) -> UniverseLoad {
    let mut load = UniverseLoad::default();

    for ticker in tickers {
        let outcome = data_port
            .fetch_bars(ticker, start_date, end_date)
            .and_then(|bars| validate_history(ticker, &bars, minimum).map(|()| bars));

        match outcome {
            Ok(bars) => load.loaded.push(LoadedTicker {
                ticker: ticker.clone(),
                bars,
            }),
            Err(e) => {
                warn!("skipping {} ({})", ticker, e);
                load.skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    load
}
