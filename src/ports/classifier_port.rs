//! Directional classifier port trait.

use crate::domain::features::{FeatureVector, Prediction};

pub trait DirectionClassifier {
    fn predict(&self, features: &FeatureVector) -> Prediction;
}
