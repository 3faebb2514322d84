//! Gini-impurity CART classifier for next-bar direction.

use log::debug;

use crate::domain::error::SigtraderError;
use crate::domain::features::{
    ClassifierConfig, ClassifierReport, Direction, FeatureVector, LabeledSample, Prediction,
    FEATURE_NAMES,
};
use crate::ports::classifier_port::DirectionClassifier;

const N_FEATURES: usize = FEATURE_NAMES.len();

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf { up_probability: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    gain: f64,
}

#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    root: Node,
    feature_importances: [f64; N_FEATURES],
}

fn is_up(sample: &LabeledSample) -> bool {
    sample.label == Direction::Up
}

fn gini(samples: &[LabeledSample], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let up = indices.iter().filter(|&&i| is_up(&samples[i])).count() as f64;
    let p = up / indices.len() as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

fn leaf(samples: &[LabeledSample], indices: &[usize]) -> Node {
    let up = indices.iter().filter(|&&i| is_up(&samples[i])).count();
    let up_probability = if indices.is_empty() {
        0.5
    } else {
        up as f64 / indices.len() as f64
    };
    Node::Leaf { up_probability }
}

struct Builder<'a> {
    samples: &'a [LabeledSample],
    config: &'a ClassifierConfig,
    importances: [f64; N_FEATURES],
}

impl Builder<'_> {
    fn build(&mut self, indices: &[usize], depth: usize) -> Node {
        let impurity = gini(self.samples, indices);
        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split.max(2)
            || impurity < 1e-12
        {
            return leaf(self.samples, indices);
        }

        match self.best_split(indices, impurity) {
            Some(split) => {
                self.importances[split.feature] += split.gain * indices.len() as f64;
                let left = self.build(&split.left, depth + 1);
                let right = self.build(&split.right, depth + 1);
                Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => leaf(self.samples, indices),
        }
    }

    /// Exhaustive search over midpoints between distinct feature values.
    /// Ties keep the first candidate found, so training is deterministic.
    fn best_split(&self, indices: &[usize], parent_impurity: f64) -> Option<Split> {
        let mut best: Option<Split> = None;
        let n = indices.len() as f64;

        for feature in 0..N_FEATURES {
            let value = |i: usize| self.samples[i].features.as_array()[feature];

            let mut values: Vec<f64> = indices.iter().map(|&i| value(i)).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();

            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| value(i) <= threshold);
                if left.is_empty() || right.is_empty() {
                    continue;
                }

                let weighted = (left.len() as f64 * gini(self.samples, &left)
                    + right.len() as f64 * gini(self.samples, &right))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold,
                        left,
                        right,
                        gain,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTreeClassifier {
    pub fn fit(samples: &[LabeledSample], config: &ClassifierConfig) -> Self {
        let indices: Vec<usize> = (0..samples.len()).collect();
        let mut builder = Builder {
            samples,
            config,
            importances: [0.0; N_FEATURES],
        };
        let root = builder.build(&indices, 0);

        let mut feature_importances = builder.importances;
        let total: f64 = feature_importances.iter().sum();
        if total > 0.0 {
            for importance in &mut feature_importances {
                *importance /= total;
            }
        }

        Self {
            root,
            feature_importances,
        }
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Normalised impurity decrease per feature, in `FEATURE_NAMES` order.
    pub fn feature_importances(&self) -> [f64; N_FEATURES] {
        self.feature_importances
    }

    fn up_probability(&self, features: &FeatureVector) -> f64 {
        let values = features.as_array();
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { up_probability } => return *up_probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if values[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

impl DirectionClassifier for DecisionTreeClassifier {
    fn predict(&self, features: &FeatureVector) -> Prediction {
        Prediction::from_up_probability(self.up_probability(features))
    }
}

/// Train on the chronologically first part of `samples` and score on the
/// rest. `Ok(None)` unless more than `config.min_samples` samples exist.
pub fn train_and_evaluate(
    ticker: &str,
    samples: &[LabeledSample],
    latest: Option<&FeatureVector>,
    config: &ClassifierConfig,
) -> Result<Option<ClassifierReport>, SigtraderError> {
    if samples.len() <= config.min_samples.max(1) {
        debug!(
            "{}: {} samples, classifier needs more than {}",
            ticker,
            samples.len(),
            config.min_samples
        );
        return Ok(None);
    }

    if let Some(position) = samples
        .iter()
        .position(|s| s.features.as_array().iter().any(|v| !v.is_finite()))
    {
        return Err(SigtraderError::Classifier {
            reason: format!("{}: non-finite feature in sample {}", ticker, position),
        });
    }

    let test_len = ((samples.len() as f64 * config.test_fraction).ceil() as usize)
        .clamp(1, samples.len() - 1);
    let (train, test) = samples.split_at(samples.len() - test_len);

    let model = DecisionTreeClassifier::fit(train, config);
    let correct = test
        .iter()
        .filter(|s| model.predict(&s.features).direction == s.label)
        .count();
    let accuracy = correct as f64 / test.len() as f64;

    let importances = model.feature_importances();
    debug!(
        "{}: tree depth {}, importances {:?}",
        ticker,
        model.depth(),
        FEATURE_NAMES.iter().zip(importances.iter()).collect::<Vec<_>>()
    );

    Ok(Some(ClassifierReport {
        ticker: ticker.to_string(),
        train_samples: train.len(),
        test_samples: test.len(),
        accuracy,
        prediction: latest.map(|f| model.predict(f)),
    }))
}
