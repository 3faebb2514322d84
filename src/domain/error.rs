//! Domain error types.
//!
//! The pure core (indicators, signals, backtest) never produces these: data
//! sparsity is expressed as absent values. Errors come from configuration,
//! ingestion and the outer collaborators.

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid price history for {ticker}: {reason}")]
    InvalidHistory { ticker: String, reason: String },

    #[error("notification failed: {reason}")]
    Notification { reason: String },

    #[error("classifier error: {reason}")]
    Classifier { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SigtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) | SigtraderError::Csv(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::Database { .. } | SigtraderError::DatabaseQuery { .. } => 3,
            SigtraderError::Notification { .. } => 4,
            SigtraderError::NoData { .. }
            | SigtraderError::InsufficientData { .. }
            | SigtraderError::InvalidHistory { .. } => 5,
            SigtraderError::Classifier { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
