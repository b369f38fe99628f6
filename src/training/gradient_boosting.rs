//! Gradient Boosting implementation
//!
//! Binary log-loss boosting of regression trees fitted to the
//! negative gradient, with shrinkage. Every tree sees every row and column,
//! so fitting is deterministic.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{ExoSeekerError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit binary classification on 0/1 targets
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ExoSeekerError::Fitting(
                "gradient boosting needs at least one sample".to_string(),
            ));
        }

        self.trees.clear();

        // Prior log odds, clipped so a one-class fold stays finite
        let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        for _ in 0..self.config.n_estimators {
            // Negative gradient of log loss
            let residuals: Array1<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(yi, lo)| yi - sigmoid(*lo))
                .collect();

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(x, &residuals)?;

            // One Newton step per leaf: sum(residual) / sum(p * (1 - p))
            tree.set_leaf_values(x, |rows| {
                let (num, den) = rows.iter().fold((0.0_f64, 0.0_f64), |(num, den), &i| {
                    let p = sigmoid(log_odds[i]);
                    (num + residuals[i], den + p * (1.0 - p))
                });
                if den.abs() < 1e-150 { 0.0 } else { num / den }
            })?;

            let tree_pred = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);

            self.trees.push(tree);
        }

        if log_odds.iter().any(|v| !v.is_finite()) {
            return Err(ExoSeekerError::Fitting(
                "gradient boosting produced non-finite scores".to_string(),
            ));
        }
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ExoSeekerError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            log_odds.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }

        Ok(log_odds.mapv(sigmoid))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
