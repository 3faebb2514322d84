//! Feature extraction for the directional classifier.
//!
//! The core only builds feature vectors and forwards them; how a classifier
//! is trained is up to the adapter behind
//! [`DirectionClassifier`](crate::ports::classifier_port::DirectionClassifier).

use std::fmt;

use crate::domain::indicator_set::EnrichedBar;

pub const FEATURE_NAMES: [&str; 5] = ["RSI", "MACD", "MACD_SIGNAL", "SMA_diff", "Volume"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub sma_diff: f64,
    pub volume: f64,
}

impl FeatureVector {
    /// Features of one bar; `None` if any indicator is undefined.
    pub fn from_bar(bar: &EnrichedBar) -> Option<Self> {
        let set = &bar.indicators;
        Some(Self {
            rsi: set.rsi14?,
            macd: set.macd?,
            macd_signal: set.macd_signal?,
            sma_diff: set.sma_diff?,
            volume: bar.bar.volume,
        })
    }

    pub fn as_array(&self) -> [f64; 5] {
        [self.rsi, self.macd, self.macd_signal, self.sma_diff, self.volume]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("UP"),
            Direction::Down => f.write_str("DOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub direction: Direction,
    pub up_probability: f64,
    pub down_probability: f64,
}

impl Prediction {
    pub fn from_up_probability(up_probability: f64) -> Self {
        let direction = if up_probability > 0.5 {
            Direction::Up
        } else {
            Direction::Down
        };
        Self {
            direction,
            up_probability,
            down_probability: 1.0 - up_probability,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.up_probability.max(self.down_probability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    /// Whether the next bar closed higher.
    pub label: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Training needs strictly more samples than this.
    pub min_samples: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Share of samples, taken from the end of the series, held out for
    /// evaluation.
    pub test_fraction: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_samples: 50,
            max_depth: 5,
            min_samples_split: 2,
            test_fraction: 0.2,
        }
    }
}

/// Outcome of training a classifier on one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierReport {
    pub ticker: String,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Fraction of held-out samples predicted correctly.
    pub accuracy: f64,
    /// Forecast for the bar after the last one, when its features exist.
    pub prediction: Option<Prediction>,
}

/// Chronological training samples: every bar with defined features that
/// has a following bar to label it.
pub fn prepare_samples(enriched: &[EnrichedBar]) -> Vec<LabeledSample> {
    enriched
        .windows(2)
        .filter_map(|w| {
            let features = FeatureVector::from_bar(&w[0])?;
            let label = if w[1].bar.close > w[0].bar.close {
                Direction::Up
            } else {
                Direction::Down
            };
            Some(LabeledSample { features, label })
        })
        .collect()
}

/// Features of the most recent bar.
pub fn latest_features(enriched: &[EnrichedBar]) -> Option<FeatureVector> {
    enriched.last().and_then(FeatureVector::from_bar)
}
