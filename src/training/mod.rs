//! Model training module
//!
//! Provides the base estimators of the disposition stack:
//! - Gini decision trees and Random Forests
//! - Gradient boosting with log-loss
//! - Neural networks (MLP)
//! - Logistic regression (stack combiner)
//! - Stratified cross-validation for out-of-fold predictions

mod config;
mod engine;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod neural_network;
pub mod random_forest;

pub use config::{EstimatorKind, EstimatorSelection, Hyperparameters, TrainingConfig};
pub use cross_validation::{CVSplit, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{train, TrainEngine, TrainedModel};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear_models::LogisticRegression;
pub use models::BinaryClassifier;
pub use neural_network::{MLPClassifier, MLPConfig};
pub use random_forest::RandomForest;
