//! Ensemble methods

mod stacking;

pub use stacking::{BaseEstimator, StackingClassifier, StackingConfig};
