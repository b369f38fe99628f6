//! Training configuration

use crate::error::{ExoSeekerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Base estimator families that can feed the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EstimatorKind {
    /// Random Forest
    RandomForest,
    /// Gradient Boosted Trees
    GradientBoosting,
    /// Neural Network (MLP)
    MultiLayerPerceptron,
}

impl EstimatorKind {
    pub const ALL: [EstimatorKind; 3] = [
        EstimatorKind::RandomForest,
        EstimatorKind::GradientBoosting,
        EstimatorKind::MultiLayerPerceptron,
    ];

    /// Short code used on the command line and in forms
    pub fn code(&self) -> &'static str {
        match self {
            EstimatorKind::RandomForest => "rf",
            EstimatorKind::GradientBoosting => "gb",
            EstimatorKind::MultiLayerPerceptron => "mlp",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EstimatorKind::RandomForest => "Random Forest",
            EstimatorKind::GradientBoosting => "Gradient Boosting",
            EstimatorKind::MultiLayerPerceptron => "Multi-Layer Perceptron",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EstimatorKind {
    type Err = ExoSeekerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rf" | "random_forest" | "randomforest" => Ok(EstimatorKind::RandomForest),
            "gb" | "gradient_boosting" | "gradientboosting" => Ok(EstimatorKind::GradientBoosting),
            "mlp" | "neural_network" | "multilayerperceptron" => {
                Ok(EstimatorKind::MultiLayerPerceptron)
            }
            other => Err(ExoSeekerError::Config(format!(
                "unknown estimator '{}' (expected rf, gb or mlp)",
                other
            ))),
        }
    }
}

/// User-chosen base estimators. The random forest is always part of the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorSelection {
    selected: BTreeSet<EstimatorKind>,
}

impl EstimatorSelection {
    /// Empty selection (resolves to the random forest alone)
    pub fn new() -> Self {
        Self::default()
    }

    /// Every estimator family
    pub fn all() -> Self {
        Self::from_kinds(EstimatorKind::ALL)
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = EstimatorKind>) -> Self {
        Self {
            selected: kinds.into_iter().collect(),
        }
    }

    /// Builder method to add an estimator
    pub fn with(mut self, kind: EstimatorKind) -> Self {
        self.selected.insert(kind);
        self
    }

    /// Whether the user picked `kind` explicitly
    pub fn is_selected(&self, kind: EstimatorKind) -> bool {
        self.selected.contains(&kind)
    }

    /// Base estimators in stack order: RF, GB, MLP. Never empty, never duplicated.
    pub fn resolve(&self) -> Vec<EstimatorKind> {
        EstimatorKind::ALL
            .into_iter()
            .filter(|k| *k == EstimatorKind::RandomForest || self.selected.contains(k))
            .collect()
    }
}

impl FromStr for EstimatorSelection {
    type Err = ExoSeekerError;

    /// Comma-separated codes such as `rf,gb,mlp`; blank input selects nothing
    fn from_str(s: &str) -> Result<Self> {
        let kinds = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(EstimatorKind::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_kinds(kinds))
    }
}

/// Hyperparameters exposed to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub rf_n_estimators: usize,
    pub rf_max_depth: usize,
    pub gb_n_estimators: usize,
    pub gb_max_depth: usize,
    pub mlp_max_iter: usize,
    pub mlp_alpha: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            rf_n_estimators: 100,
            rf_max_depth: 3,
            gb_n_estimators: 100,
            gb_max_depth: 3,
            mlp_max_iter: 100,
            mlp_alpha: 0.0001,
        }
    }
}

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("rf_n_estimators", self.rf_n_estimators),
            ("rf_max_depth", self.rf_max_depth),
            ("gb_n_estimators", self.gb_n_estimators),
            ("gb_max_depth", self.gb_max_depth),
            ("mlp_max_iter", self.mlp_max_iter),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(ExoSeekerError::Config(format!("{} must be at least 1", name)));
            }
        }
        if !self.mlp_alpha.is_finite() || self.mlp_alpha < 0.0 {
            return Err(ExoSeekerError::Config(format!(
                "mlp_alpha must be a finite non-negative number, got {}",
                self.mlp_alpha
            )));
        }
        Ok(())
    }
}

/// Fixed training settings not exposed as hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed shared by every base estimator and the fold assignment
    pub random_state: u64,
    /// Folds used to build out-of-fold meta-features
    pub cv_folds: usize,
    /// Gradient boosting shrinkage
    pub gb_learning_rate: f64,
    /// Hidden units of the single MLP layer
    pub mlp_hidden_units: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            cv_folds: 5,
            gb_learning_rate: 0.1,
            mlp_hidden_units: 100,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the number of stacking folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }
}
