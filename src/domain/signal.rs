//! Signal generator: classifies each enriched bar as BUY, SELL or NONE.
//!
//! Per bar it derives the rule inputs (volume spike, 5-day change, price
//! reversal, SMA crossovers) and evaluates the BUY and SELL rule sets.
//! A clause that reads an undefined value is false.
//!
//! Precedence: SELL is checked first and is final. A bar satisfying both
//! rule sets is SELL.

use std::fmt;

use crate::domain::indicator::calculate_sma;
use crate::domain::indicator_set::{EnrichedBar, IndicatorSet};
use crate::domain::ohlcv::PriceBar;
use crate::domain::strategy::StrategyConfig;

pub const VOLUME_MA_PERIOD: usize = 20;
/// RSI level above which a sharp 5-day drop counts as a reversal.
pub const REVERSAL_RSI_FLOOR: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
    None,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::None => "NONE",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Signal::None)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values derived by the generator on top of the indicator set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuleInputs {
    pub volume_ma20: Option<f64>,
    pub volume_spike: bool,
    pub price_change_5d: Option<f64>,
    pub price_reversal: bool,
    pub crossover_up: bool,
    pub crossover_down: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignaledBar {
    pub bar: PriceBar,
    pub indicators: IndicatorSet,
    pub inputs: RuleInputs,
    pub signal: Signal,
}

pub fn generate_signals(enriched: &[EnrichedBar], config: &StrategyConfig) -> Vec<SignaledBar> {
    let volumes: Vec<f64> = enriched.iter().map(|e| e.bar.volume).collect();
    let volume_ma = calculate_sma(&volumes, VOLUME_MA_PERIOD);
    let lookback = config.reversal_lookback_days;

    enriched
        .iter()
        .enumerate()
        .map(|(i, current)| {
            let rsi = current.indicators.rsi14;
            let volume_ma20 = volume_ma.get(i);
            let volume_spike = volume_ma20
                .is_some_and(|ma| current.bar.volume > ma * config.volume_spike_multiplier);

            let price_change_5d = if lookback > 0 && i >= lookback {
                current.bar.change_from(enriched[i - lookback].bar.close)
            } else {
                None
            };
            let price_reversal = price_change_5d.is_some_and(|c| c < config.reversal_pct_threshold)
                && rsi.is_some_and(|r| r > REVERSAL_RSI_FLOOR);

            let previous = i.checked_sub(1).map(|p| &enriched[p].indicators);
            let (crossover_up, crossover_down) = crossovers(&current.indicators, previous);

            let inputs = RuleInputs {
                volume_ma20,
                volume_spike,
                price_change_5d,
                price_reversal,
                crossover_up,
                crossover_down,
            };

            SignaledBar {
                bar: current.bar.clone(),
                indicators: current.indicators,
                inputs,
                signal: classify(rsi, &inputs, config),
            }
        })
        .collect()
}

/// Ordered rule evaluation: the first rule set that matches decides.
pub fn classify(rsi: Option<f64>, inputs: &RuleInputs, config: &StrategyConfig) -> Signal {
    if is_sell(rsi, inputs, config) {
        Signal::Sell
    } else if is_buy(rsi, inputs, config) {
        Signal::Buy
    } else {
        Signal::None
    }
}

fn is_buy(rsi: Option<f64>, inputs: &RuleInputs, config: &StrategyConfig) -> bool {
    let below = |threshold: f64| rsi.is_some_and(|r| r < threshold);

    below(config.rsi_oversold)
        || (below(config.rsi_buy_crossover_threshold) && inputs.crossover_up)
        || (below(config.rsi_buy_volume_threshold) && inputs.volume_spike)
}

fn is_sell(rsi: Option<f64>, inputs: &RuleInputs, config: &StrategyConfig) -> bool {
    rsi.is_some_and(|r| r > config.rsi_overbought)
        || inputs.crossover_down
        || inputs.price_reversal
}

fn crossovers(current: &IndicatorSet, previous: Option<&IndicatorSet>) -> (bool, bool) {
    let now = current.sma20.zip(current.sma50);
    let before = previous.and_then(|p| p.sma20.zip(p.sma50));

    match (now, before) {
        (Some((fast, slow)), Some((prev_fast, prev_slow))) => (
            fast > slow && prev_fast <= prev_slow,
            fast < slow && prev_fast >= prev_slow,
        ),
        _ => (false, false),
    }
}

/// The last `count` bars carrying a BUY or SELL, oldest first.
pub fn recent_signals(signaled: &[SignaledBar], count: usize) -> Vec<&SignaledBar> {
    let mut recent: Vec<&SignaledBar> = signaled
        .iter()
        .rev()
        .filter(|s| s.signal.is_actionable())
        .take(count)
        .collect();
    recent.reverse();
    recent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator_set::add_indicators;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64], volumes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| PriceBar {
                ticker: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect()
    }

    fn inputs() -> RuleInputs {
        RuleInputs::default()
    }

    #[test]
    fn oversold_rsi_is_buy() {
        let c = StrategyConfig::default();
        assert_eq!(classify(Some(29.9), &inputs(), &c), Signal::Buy);
        assert_eq!(classify(Some(30.0), &inputs(), &c), Signal::None);
    }

    #[test]
    fn crossover_buy_needs_rsi_below_36() {
        let c = StrategyConfig::default();
        let up = RuleInputs {
            crossover_up: true,
            ..inputs()
        };
        assert_eq!(classify(Some(35.0), &up, &c), Signal::Buy);
        assert_eq!(classify(Some(36.0), &up, &c), Signal::None);
    }

    #[test]
    fn volume_spike_buy_needs_rsi_below_42() {
        let c = StrategyConfig::default();
        let spike = RuleInputs {
            volume_spike: true,
            ..inputs()
        };
        assert_eq!(classify(Some(41.0), &spike, &c), Signal::Buy);
        assert_eq!(classify(Some(42.5), &spike, &c), Signal::None);
    }

    #[test]
    fn sell_rules() {
        let c = StrategyConfig::default();
        assert_eq!(classify(Some(70.1), &inputs(), &c), Signal::Sell);
        let down = RuleInputs {
            crossover_down: true,
            ..inputs()
        };
        assert_eq!(classify(Some(50.0), &down, &c), Signal::Sell);
        let reversal = RuleInputs {
            price_reversal: true,
            ..inputs()
        };
        assert_eq!(classify(Some(55.0), &reversal, &c), Signal::Sell);
    }

    #[test]
    fn sell_wins_ties() {
        let c = StrategyConfig::default();
        let both = RuleInputs {
            crossover_down: true,
            ..inputs()
        };
        // RSI < 30 alone would be BUY.
        assert_eq!(classify(Some(20.0), &both, &c), Signal::Sell);
    }

    #[test]
    fn undefined_rsi_never_buys() {
        let c = StrategyConfig::default();
        let everything = RuleInputs {
            crossover_up: true,
            volume_spike: true,
            ..inputs()
        };
        assert_eq!(classify(None, &everything, &c), Signal::None);
    }

    #[test]
    fn undefined_rsi_still_honours_crossover_down() {
        let c = StrategyConfig::default();
        let down = RuleInputs {
            crossover_down: true,
            ..inputs()
        };
        assert_eq!(classify(None, &down, &c), Signal::Sell);
    }

    #[test]
    fn crossover_requires_both_bars_defined() {
        let current = IndicatorSet {
            sma20: Some(101.0),
            sma50: Some(100.0),
            ..IndicatorSet::default()
        };
        let prev_undefined = IndicatorSet {
            sma20: Some(99.0),
            sma50: None,
            ..IndicatorSet::default()
        };
        assert_eq!(crossovers(&current, Some(&prev_undefined)), (false, false));
        assert_eq!(crossovers(&current, None), (false, false));

        let prev_below = IndicatorSet {
            sma20: Some(100.0),
            sma50: Some(100.0),
            ..IndicatorSet::default()
        };
        assert_eq!(crossovers(&current, Some(&prev_below)), (true, false));
    }

    #[test]
    fn crossover_down_mirror() {
        let current = IndicatorSet {
            sma20: Some(99.0),
            sma50: Some(100.0),
            ..IndicatorSet::default()
        };
        let prev = IndicatorSet {
            sma20: Some(100.5),
            sma50: Some(100.0),
            ..IndicatorSet::default()
        };
        assert_eq!(crossovers(&current, Some(&prev)), (false, true));
    }

    #[test]
    fn derived_inputs_warmup() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i % 4) as f64).collect();
        let bars = make_bars(&prices, &[1000.0; 30]);
        let signaled = generate_signals(&add_indicators(&bars), &StrategyConfig::default());

        assert!(signaled[18].inputs.volume_ma20.is_none());
        assert!(signaled[19].inputs.volume_ma20.is_some());
        assert!(signaled[4].inputs.price_change_5d.is_none());
        assert!(signaled[5].inputs.price_change_5d.is_some());
        assert!(signaled.iter().all(|s| !s.inputs.volume_spike));
    }

    #[test]
    fn volume_spike_detected() {
        let mut volumes = vec![1000.0; 25];
        volumes[24] = 2000.0;
        let bars = make_bars(&[100.0; 25], &volumes);
        let signaled = generate_signals(&add_indicators(&bars), &StrategyConfig::default());
        // MA over the last 20 = (19*1000 + 2000)/20 = 1050; 2000 > 1365
        assert!(signaled[24].inputs.volume_spike);
        assert!(!signaled[23].inputs.volume_spike);
    }

    #[test]
    fn price_change_5d_value() {
        let prices = [100.0, 101.0, 102.0, 103.0, 104.0, 95.0];
        let bars = make_bars(&prices, &[1000.0; 6]);
        let signaled = generate_signals(&add_indicators(&bars), &StrategyConfig::default());
        let change = signaled[5].inputs.price_change_5d.unwrap();
        assert!((change - -0.05).abs() < 1e-12);
        // RSI undefined this early, so no reversal.
        assert!(!signaled[5].inputs.price_reversal);
    }

    #[test]
    fn flat_series_has_no_signals() {
        let bars = make_bars(&[100.0; 60], &[1000.0; 60]);
        let signaled = generate_signals(&add_indicators(&bars), &StrategyConfig::default());
        assert_eq!(signaled.len(), 60);
        assert!(signaled.iter().all(|s| s.signal == Signal::None));
    }

    #[test]
    fn drop_after_flat_is_buy() {
        let mut prices = vec![100.0; 49];
        prices.push(90.0);
        let bars = make_bars(&prices, &[1000.0; 50]);
        let signaled = generate_signals(&add_indicators(&bars), &StrategyConfig::default());
        assert_eq!(signaled[49].signal, Signal::Buy);
    }

    #[test]
    fn empty_input() {
        assert!(generate_signals(&[], &StrategyConfig::default()).is_empty());
    }

    #[test]
    fn recent_signals_takes_last_actionable() {
        let bars = make_bars(&[100.0; 8], &[1000.0; 8]);
        let mut signaled = generate_signals(&add_indicators(&bars), &StrategyConfig::default());
        signaled[1].signal = Signal::Buy;
        signaled[3].signal = Signal::Sell;
        signaled[6].signal = Signal::Buy;

        let recent = recent_signals(&signaled, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].bar.date, signaled[3].bar.date);
        assert_eq!(recent[1].bar.date, signaled[6].bar.date);

        assert_eq!(recent_signals(&signaled, 10).len(), 3);
    }

    #[test]
    fn signal_display() {
        assert_eq!(Signal::Buy.to_string(), "BUY");
        assert_eq!(Signal::Sell.to_string(), "SELL");
        assert_eq!(Signal::None.to_string(), "NONE");
    }
}
