//! Configuration validation.
//!
//! Validates every section before a scan or backtest runs. Missing keys fall
//! back to their defaults; present keys must hold sensible values.

use crate::domain::error::SigtraderError;
use crate::domain::features::ClassifierConfig;
use crate::domain::strategy::StrategyConfig;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_universe_config(config)?;
    validate_data_config(config)?;
    validate_strategy_config(config)?;
    validate_ml_config(config)?;
    Ok(())
}

pub fn validate_universe_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if let Some(tickers) = config.get_string("universe", "tickers") {
        parse_tickers(&tickers)
            .map_err(|e| SigtraderError::invalid("universe", "tickers", e.to_string()))?;
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let start = parse_optional_date(config, "data", "start_date")?;
    let end = parse_optional_date(config, "data", "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(SigtraderError::invalid(
                "data",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }

    match config.get_string("data", "source").as_deref().map(str::trim) {
        None | Some("csv") | Some("sqlite") => Ok(()),
        Some(other) => Err(SigtraderError::invalid(
            "data",
            "source",
            format!("unknown source '{}' (expected csv or sqlite)", other),
        )),
    }
}

const STRATEGY_FLOAT_KEYS: [&str; 8] = [
    "stop_loss_pct",
    "take_profit_pct",
    "rsi_oversold",
    "rsi_overbought",
    "rsi_buy_crossover_threshold",
    "rsi_buy_volume_threshold",
    "volume_spike_multiplier",
    "reversal_pct_threshold",
];

const STRATEGY_INT_KEYS: [&str; 3] = [
    "max_hold_days",
    "reversal_lookback_days",
    "recent_signal_count",
];

/// A present value must parse as a finite number. Absent keys take their
/// defaults.
fn check_float(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(()),
            _ => Err(SigtraderError::invalid(
                section,
                key,
                format!("{} must be a finite number, got '{}'", key, raw),
            )),
        },
    }
}

fn check_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(raw) => raw.trim().parse::<i64>().map(|_| ()).map_err(|_| {
            SigtraderError::invalid(
                section,
                key,
                format!("{} must be an integer, got '{}'", key, raw),
            )
        }),
    }
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    for key in STRATEGY_FLOAT_KEYS {
        check_float(config, "strategy", key)?;
    }
    for key in STRATEGY_INT_KEYS {
        check_int(config, "strategy", key)?;
    }

    let strategy = read_strategy_config(config);

    if strategy.max_hold_days < 1 {
        return Err(SigtraderError::invalid(
            "strategy",
            "max_hold_days",
            "max_hold_days must be at least 1",
        ));
    }
    if strategy.stop_loss_pct >= 0.0 {
        return Err(SigtraderError::invalid(
            "strategy",
            "stop_loss_pct",
            "stop_loss_pct must be negative",
        ));
    }
    if strategy.take_profit_pct <= 0.0 {
        return Err(SigtraderError::invalid(
            "strategy",
            "take_profit_pct",
            "take_profit_pct must be positive",
        ));
    }

    let rsi_levels = [
        ("rsi_oversold", strategy.rsi_oversold),
        ("rsi_overbought", strategy.rsi_overbought),
        (
            "rsi_buy_crossover_threshold",
            strategy.rsi_buy_crossover_threshold,
        ),
        ("rsi_buy_volume_threshold", strategy.rsi_buy_volume_threshold),
    ];
    for (key, value) in rsi_levels {
        if !(0.0..=100.0).contains(&value) {
            return Err(SigtraderError::invalid(
                "strategy",
                key,
                format!("{} must be between 0 and 100", key),
            ));
        }
    }
    if strategy.rsi_oversold >= strategy.rsi_overbought {
        return Err(SigtraderError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }

    if strategy.volume_spike_multiplier <= 0.0 {
        return Err(SigtraderError::invalid(
            "strategy",
            "volume_spike_multiplier",
            "volume_spike_multiplier must be positive",
        ));
    }
    if config.get_int("strategy", "reversal_lookback_days", 5) < 1 {
        return Err(SigtraderError::invalid(
            "strategy",
            "reversal_lookback_days",
            "reversal_lookback_days must be at least 1",
        ));
    }
    if config.get_int("strategy", "recent_signal_count", 5) < 0 {
        return Err(SigtraderError::invalid(
            "strategy",
            "recent_signal_count",
            "recent_signal_count must be non-negative",
        ));
    }
    Ok(())
}

pub fn validate_ml_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    check_int(config, "ml", "min_samples")?;
    check_int(config, "ml", "max_depth")?;
    check_float(config, "ml", "test_fraction")?;

    if config.get_int("ml", "min_samples", 50) < 2 {
        return Err(SigtraderError::invalid(
            "ml",
            "min_samples",
            "min_samples must be at least 2",
        ));
    }
    if config.get_int("ml", "max_depth", 5) < 1 {
        return Err(SigtraderError::invalid(
            "ml",
            "max_depth",
            "max_depth must be at least 1",
        ));
    }
    let fraction = config.get_double("ml", "test_fraction", 0.2);
    if fraction <= 0.0 || fraction >= 1.0 {
        return Err(SigtraderError::invalid(
            "ml",
            "test_fraction",
            "test_fraction must be between 0 and 1 (exclusive)",
        ));
    }
    Ok(())
}

/// Strategy parameters with defaults for missing keys. Does not validate.
pub fn read_strategy_config(config: &dyn ConfigPort) -> StrategyConfig {
    let d = StrategyConfig::default();
    StrategyConfig {
        max_hold_days: config.get_int("strategy", "max_hold_days", d.max_hold_days),
        stop_loss_pct: config.get_double("strategy", "stop_loss_pct", d.stop_loss_pct),
        take_profit_pct: config.get_double("strategy", "take_profit_pct", d.take_profit_pct),
        rsi_oversold: config.get_double("strategy", "rsi_oversold", d.rsi_oversold),
        rsi_overbought: config.get_double("strategy", "rsi_overbought", d.rsi_overbought),
        rsi_buy_crossover_threshold: config.get_double(
            "strategy",
            "rsi_buy_crossover_threshold",
            d.rsi_buy_crossover_threshold,
        ),
        rsi_buy_volume_threshold: config.get_double(
            "strategy",
            "rsi_buy_volume_threshold",
            d.rsi_buy_volume_threshold,
        ),
        volume_spike_multiplier: config.get_double(
            "strategy",
            "volume_spike_multiplier",
            d.volume_spike_multiplier,
        ),
        reversal_lookback_days: non_negative(config.get_int(
            "strategy",
            "reversal_lookback_days",
            d.reversal_lookback_days as i64,
        )),
        reversal_pct_threshold: config.get_double(
            "strategy",
            "reversal_pct_threshold",
            d.reversal_pct_threshold,
        ),
        recent_signal_count: non_negative(config.get_int(
            "strategy",
            "recent_signal_count",
            d.recent_signal_count as i64,
        )),
    }
}

/// Validated strategy parameters.
pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, SigtraderError> {
    validate_strategy_config(config)?;
    Ok(read_strategy_config(config))
}

/// Validated classifier settings; `None` when `[ml] enabled` is false.
pub fn load_classifier_config(
    config: &dyn ConfigPort,
) -> Result<Option<ClassifierConfig>, SigtraderError> {
    validate_ml_config(config)?;
    if !config.get_bool("ml", "enabled", true) {
        return Ok(None);
    }
    let d = ClassifierConfig::default();
    Ok(Some(ClassifierConfig {
        min_samples: non_negative(config.get_int("ml", "min_samples", d.min_samples as i64)),
        max_depth: non_negative(config.get_int("ml", "max_depth", d.max_depth as i64)),
        min_samples_split: d.min_samples_split,
        test_fraction: config.get_double("ml", "test_fraction", d.test_fraction),
    }))
}

pub fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                SigtraderError::invalid(
                    section,
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

fn non_negative(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
