//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::decision_tree::train_and_evaluate;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::domain::alerts::{format_error_alert, format_signal_alert, format_summary_alert};
use crate::domain::config_validation::{
    load_classifier_config, load_strategy_config, parse_optional_date, validate_config,
};
use crate::domain::error::SigtraderError;
use crate::domain::features::{
    latest_features, prepare_samples, ClassifierConfig, ClassifierReport,
};
use crate::domain::metrics::OverallSummary;
use crate::domain::pipeline::{
    analyze_ticker, analyze_universe, log_backtest, log_signal, summarize, TickerAnalysis,
};
use crate::domain::strategy::StrategyConfig;
use crate::domain::universe::{
    load_universe, parse_tickers, validate_history, SkippedTicker, DEFAULT_TICKERS,
    MIN_HISTORY_BARS,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::notify_port::Notifier;
use crate::ports::report_port::{SignalRecord, SignalSink};

pub const SCAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser, Debug)]
#[command(
    name = "sigtrader",
    about = "Technical-indicator signal scanner and backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan every configured ticker once: signals, backtest, alerts
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated tickers overriding [universe] tickers
        #[arg(long)]
        tickers: Option<String>,
    },
    /// Backtest a single ticker and print its trade ledger
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tickers available in the configured data source
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan { config, tickers } => run_scan(&config, tickers.as_deref()),
        Command::Backtest { config, ticker } => run_backtest(&config, &ticker),
        Command::Validate { config } => run_validate(&config),
        Command::ListTickers { config } => run_list_tickers(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        error!("{e}");
        ExitCode::from(&e)
    })
}

fn fail(e: SigtraderError) -> ExitCode {
    error!("{e}");
    ExitCode::from(&e)
}

/// Everything a scan needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub strategy: StrategyConfig,
    pub classifier: Option<ClassifierConfig>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scan_time: String,
}

impl ScanSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SigtraderError> {
        validate_config(config)?;
        let (start_date, end_date) = date_range(config)?;
        Ok(Self {
            strategy: load_strategy_config(config)?,
            classifier: load_classifier_config(config)?,
            start_date,
            end_date,
            scan_time: Local::now().format(SCAN_TIME_FORMAT).to_string(),
        })
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub analyses: Vec<TickerAnalysis>,
    pub skipped: Vec<SkippedTicker>,
    pub classifier_reports: Vec<ClassifierReport>,
    pub summary: OverallSummary,
}

/// `[data] start_date`/`end_date`; absent bounds leave the range open
/// (history start, today).
pub fn date_range(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), SigtraderError> {
    let start = parse_optional_date(config, "data", "start_date")?;
    let end = parse_optional_date(config, "data", "end_date")?;
    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    Ok((
        start.unwrap_or(earliest),
        end.unwrap_or_else(|| Local::now().date_naive()),
    ))
}

/// `--tickers` wins over `[universe] tickers`, which falls back to the
/// default universe.
pub fn resolve_tickers(
    tickers_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SigtraderError> {
    match tickers_override {
        Some(list) => parse_tickers(list)
            .map_err(|e| SigtraderError::invalid("universe", "tickers", e.to_string())),
        None => {
            let list = config
                .get_string("universe", "tickers")
                .unwrap_or_else(|| DEFAULT_TICKERS.to_string());
            parse_tickers(&list)
                .map_err(|e| SigtraderError::invalid("universe", "tickers", e.to_string()))
        }
    }
}

pub fn open_data_source(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, SigtraderError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim() {
        "csv" => {
            let dir = config
                .get_string("data", "dir")
                .unwrap_or_else(|| "data".to_string());
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            Ok(Box::new(adapter))
        }
        other => Err(SigtraderError::invalid(
            "data",
            "source",
            format!("data source '{}' is not available in this build", other),
        )),
    }
}

pub fn open_sink(config: &dyn ConfigPort) -> Result<Box<dyn SignalSink>, SigtraderError> {
    #[cfg(feature = "sqlite")]
    {
        if let Some(path) = config.get_string("output", "sqlite_path") {
            let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::open(&path, 1)?;
            adapter.initialize_schema()?;
            return Ok(Box::new(adapter));
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        if config.get_string("output", "sqlite_path").is_some() {
            warn!("[output] sqlite_path ignored: built without sqlite support");
        }
    }

    let dir = config
        .get_string("output", "dir")
        .unwrap_or_else(|| "output".to_string());
    Ok(Box::new(CsvReportAdapter::new(dir)?))
}

pub fn open_notifier(config: &dyn ConfigPort) -> Box<dyn Notifier> {
    #[cfg(feature = "telegram")]
    {
        match crate::adapters::telegram_adapter::TelegramNotifier::from_config(config) {
            Ok(Some(notifier)) => return Box::new(notifier),
            Ok(None) => {}
            Err(e) => warn!("telegram disabled: {e}"),
        }
    }

    #[cfg(not(feature = "telegram"))]
    {
        if config.get_string("telegram", "token").is_some() {
            warn!("[telegram] credentials ignored: built without telegram support");
        }
    }

    Box::new(LogNotifier)
}

fn notify(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text) {
        warn!("{e}");
    }
}

/// One complete scan over `tickers`. Per-ticker data problems skip the
/// ticker; sink failures abort the scan. Notification failures are logged
/// and never abort.
pub fn run_scan_pipeline(
    tickers: &[String],
    data_port: &dyn DataPort,
    sink: &dyn SignalSink,
    notifier: &dyn Notifier,
    settings: &ScanSettings,
) -> Result<ScanOutcome, SigtraderError> {
    info!("Starting scan for: {}", tickers.join(", "));

    let minimum = MIN_HISTORY_BARS.max(settings.strategy.min_history_bars());
    let universe = load_universe(
        data_port,
        tickers,
        settings.start_date,
        settings.end_date,
        minimum,
    );
    let analyses = analyze_universe(&universe.loaded, &settings.strategy);

    let notes = format!("scan {}", settings.scan_time);
    let mut classifier_reports = Vec::new();

    for analysis in &analyses {
        for bar in analysis.recent(settings.strategy.recent_signal_count) {
            log_signal(&analysis.ticker, bar);
            sink.append_signal(&SignalRecord::from_bar(&analysis.ticker, bar, notes.as_str()))?;
            notify(notifier, &format_signal_alert(&analysis.ticker, bar));
        }

        log_backtest(&analysis.ticker, &analysis.result);

        if let Some(classifier) = &settings.classifier {
            let samples = prepare_samples(&analysis.enriched);
            let latest = latest_features(&analysis.enriched);
            match train_and_evaluate(&analysis.ticker, &samples, latest.as_ref(), classifier) {
                Ok(Some(report)) => {
                    info!("{} ML acc: {:.3}", analysis.ticker, report.accuracy);
                    if let Some(p) = &report.prediction {
                        info!(
                            "{} next bar: {} ({:.1}% confidence)",
                            analysis.ticker,
                            p.direction,
                            p.confidence() * 100.0
                        );
                    }
                    classifier_reports.push(report);
                }
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
        }
    }

    let mut summary = summarize(&analyses, &settings.scan_time);
    summary.total_tickers = tickers.len();

    sink.write_summary(&summary)?;
    sink.write_analytics(&classifier_reports)?;
    notify(notifier, &format_summary_alert(&summary));

    info!(
        "Scan complete: {} analysed, {} skipped",
        analyses.len(),
        universe.skipped.len()
    );

    Ok(ScanOutcome {
        analyses,
        skipped: universe.skipped,
        classifier_reports,
        summary,
    })
}

fn run_scan(config_path: &Path, tickers_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let notifier = open_notifier(&config);

    let result = ScanSettings::from_config(&config).and_then(|settings| {
        let tickers = resolve_tickers(tickers_override, &config)?;
        let data_port = open_data_source(&config)?;
        let sink = open_sink(&config)?;
        run_scan_pipeline(
            &tickers,
            data_port.as_ref(),
            sink.as_ref(),
            notifier.as_ref(),
            &settings,
        )
    });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("Error in scan: {e}");
            error!("{message}");
            let now = Local::now().format(SCAN_TIME_FORMAT).to_string();
            notify(notifier.as_ref(), &format_error_alert(&message, &now));
            ExitCode::from(&e)
        }
    }
}

fn run_backtest(config_path: &Path, ticker: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let analysis = match backtest_ticker(&config, ticker) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    print_ledger(&analysis);
    log_backtest(&analysis.ticker, &analysis.result);
    ExitCode::SUCCESS
}

pub fn backtest_ticker(
    config: &dyn ConfigPort,
    ticker: &str,
) -> Result<TickerAnalysis, SigtraderError> {
    validate_config(config)?;
    let strategy = load_strategy_config(config)?;
    let (start_date, end_date) = date_range(config)?;
    let data_port = open_data_source(config)?;

    let ticker = ticker.trim().to_uppercase();
    let bars = data_port.fetch_bars(&ticker, start_date, end_date)?;
    validate_history(
        &ticker,
        &bars,
        MIN_HISTORY_BARS.max(strategy.min_history_bars()),
    )?;
    Ok(analyze_ticker(&ticker, &bars, &strategy))
}

fn print_ledger(analysis: &TickerAnalysis) {
    println!(
        "{:<12} {:<12} {:>10} {:>10} {:>10} {:>8} {:>5}  REASON",
        "ENTRY", "EXIT", "ENTRY_PX", "EXIT_PX", "PNL", "PNL%", "DAYS"
    );
    for t in &analysis.trades {
        println!(
            "{:<12} {:<12} {:>10.2} {:>10.2} {:>10.2} {:>8.2} {:>5}  {}",
            t.entry_date.to_string(),
            t.exit_date.to_string(),
            t.entry_price,
            t.exit_price,
            t.pnl,
            t.pnl_pct,
            t.days_held,
            t.exit_reason
        );
    }

    let r = &analysis.result;
    println!();
    println!("Trades:      {}", r.total);
    println!("Wins:        {}", r.wins);
    println!("Losses:      {}", r.losses);
    println!("Net P&L:     {:.2}", r.net_pnl);
    println!("Win ratio:   {:.2}%", r.win_ratio);
    println!("Avg P&L:     {:.2}", r.avg_pnl);
    println!("Avg win:     {:.2}", r.avg_win);
    println!("Avg loss:    {:.2}", r.avg_loss);
}

fn run_validate(config_path: &Path) -> ExitCode {
    info!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match ScanSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let tickers = match resolve_tickers(None, &config) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let strategy = &settings.strategy;
    println!("Universe:   {}", tickers.join(", "));
    println!("Range:      {} to {}", settings.start_date, settings.end_date);
    println!(
        "Exits:      stop {}%, target {}%, max {} days",
        strategy.stop_loss_pct, strategy.take_profit_pct, strategy.max_hold_days
    );
    println!(
        "RSI:        oversold {}, overbought {}",
        strategy.rsi_oversold, strategy.rsi_overbought
    );
    match &settings.classifier {
        Some(c) => println!(
            "Classifier: depth {}, min samples {}, test share {}",
            c.max_depth, c.min_samples, c.test_fraction
        ),
        None => println!("Classifier: disabled"),
    }
    info!("Config validated successfully");
    ExitCode::SUCCESS
}

fn run_list_tickers(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let data_port = match open_data_source(&config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let tickers = match data_port.list_tickers() {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    if tickers.is_empty() {
        warn!("No tickers found");
        return ExitCode::SUCCESS;
    }

    for ticker in &tickers {
        match data_port.get_data_range(ticker) {
            Ok(Some((first, last, count))) => {
                println!("{:<14} {} to {} ({} bars)", ticker, first, last, count)
            }
            Ok(None) => println!("{:<14} (no bars)", ticker),
            Err(e) => warn!("{}: {}", ticker, e),
        }
    }
    info!("{} tickers found", tickers.len());
    ExitCode::SUCCESS
}
