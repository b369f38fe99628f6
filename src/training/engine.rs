//! Training engine implementation

use super::config::{EstimatorKind, EstimatorSelection, Hyperparameters, TrainingConfig};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::neural_network::{MLPClassifier, MLPConfig};
use super::random_forest::RandomForest;
use crate::ensemble::{BaseEstimator, StackingClassifier, StackingConfig};
use crate::error::{ExoSeekerError, Result};
use crate::preprocessing::{InferenceScaling, PreprocessingConfig, Preprocessor, StandardScaler};
use crate::schema::Disposition;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Main training engine
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Unfitted base estimators for `selection`, in stack order
    pub fn base_estimators(
        &self,
        selection: &EstimatorSelection,
        hyperparameters: &Hyperparameters,
    ) -> Vec<BaseEstimator> {
        let seed = self.config.random_state;
        selection
            .resolve()
            .into_iter()
            .map(|kind| match kind {
                EstimatorKind::RandomForest => BaseEstimator::RandomForest(
                    RandomForest::new_classifier(hyperparameters.rf_n_estimators)
                        .with_max_depth(hyperparameters.rf_max_depth)
                        .with_random_state(seed),
                ),
                EstimatorKind::GradientBoosting => {
                    BaseEstimator::GradientBoosting(GradientBoostingClassifier::new(
                        GradientBoostingConfig {
                            n_estimators: hyperparameters.gb_n_estimators,
                            learning_rate: self.config.gb_learning_rate,
                            max_depth: hyperparameters.gb_max_depth,
                            ..Default::default()
                        },
                    ))
                }
                EstimatorKind::MultiLayerPerceptron => {
                    BaseEstimator::MultiLayerPerceptron(MLPClassifier::new(MLPConfig {
                        hidden_layers: vec![self.config.mlp_hidden_units],
                        max_epochs: hyperparameters.mlp_max_iter,
                        alpha: hyperparameters.mlp_alpha,
                        random_state: Some(seed),
                        ..Default::default()
                    }))
                }
            })
            .collect()
    }

    /// Fit the stacked ensemble
    pub fn fit(
        &self,
        x: &Array2<f64>,
        labels: &[Disposition],
        selection: &EstimatorSelection,
        hyperparameters: &Hyperparameters,
    ) -> Result<StackingClassifier> {
        let start = Instant::now();
        hyperparameters.validate()?;

        if x.nrows() != labels.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ExoSeekerError::Fitting(
                "feature matrix contains non-finite values".to_string(),
            ));
        }
        if labels.iter().any(|l| *l == Disposition::FalsePositive) {
            return Err(ExoSeekerError::Fitting(
                "training labels must be CONFIRMED or CANDIDATE".to_string(),
            ));
        }

        let y: Array1<f64> = labels.iter().map(Disposition::to_target).collect();
        let n_confirmed = y.iter().filter(|v| **v > 0.5).count();
        if n_confirmed == 0 || n_confirmed == y.len() {
            return Err(ExoSeekerError::Fitting(format!(
                "training labels contain a single class ({} rows)",
                y.len()
            )));
        }

        let estimators = self.base_estimators(selection, hyperparameters);
        let kinds: Vec<&str> = estimators.iter().map(|e| e.kind().code()).collect();
        debug!(estimators = ?kinds, "Assembled base estimators");

        let stacking_config = StackingConfig {
            n_folds: self.config.cv_folds,
            seed: Some(self.config.random_state),
            ..Default::default()
        };
        let mut stack = StackingClassifier::new(stacking_config, estimators);
        stack.fit(x, &y).map_err(|e| match e {
            ExoSeekerError::Fitting(_) | ExoSeekerError::Config(_) => e,
            other => ExoSeekerError::Fitting(other.to_string()),
        })?;

        info!(
            rows = x.nrows(),
            n_features = x.ncols(),
            n_confirmed,
            estimators = ?kinds,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Trained stacking ensemble"
        );

        Ok(stack)
    }
}

/// Train a stacked ensemble on scaled features and CONFIRMED/CANDIDATE labels
pub fn train(
    x: &Array2<f64>,
    labels: &[Disposition],
    selection: &EstimatorSelection,
    hyperparameters: &Hyperparameters,
    config: &TrainingConfig,
) -> Result<StackingClassifier> {
    TrainEngine::new(config.clone()).fit(x, labels, selection, hyperparameters)
}

/// Everything needed to classify new tables, persisted in the model slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Feature columns in training order
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub stack: StackingClassifier,
    pub selection: EstimatorSelection,
    pub hyperparameters: Hyperparameters,
    pub preprocessing: PreprocessingConfig,
    pub trained_at: DateTime<Utc>,
    /// Crate version that produced the model
    pub version: String,
}

impl TrainedModel {
    pub fn new(
        feature_names: Vec<String>,
        scaler: StandardScaler,
        stack: StackingClassifier,
        selection: EstimatorSelection,
        hyperparameters: Hyperparameters,
        preprocessing: PreprocessingConfig,
    ) -> Self {
        Self {
            feature_names,
            scaler,
            stack,
            selection,
            hyperparameters,
            preprocessing,
            trained_at: Utc::now(),
            version: crate::VERSION.to_string(),
        }
    }

    /// Classify already scaled features laid out in training order
    pub fn predict_features(&self, x: &Array2<f64>) -> Result<Vec<Disposition>> {
        if x.ncols() != self.feature_names.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let predictions = self.stack.predict(x)?;
        Ok(predictions.iter().map(|v| Disposition::from_target(*v)).collect())
    }

    /// Preprocess a raw inference table and classify every row
    pub fn predict(&self, df: &DataFrame, scaling: &InferenceScaling) -> Result<Vec<Disposition>> {
        let preprocessor = Preprocessor::new(self.preprocessing.clone());
        let prepared = preprocessor.prepare_inference(df, scaling)?;
        let features = self.align(prepared.features, &prepared.feature_names)?;
        self.predict_features(&features)
    }

    /// Reorder batch-scaled columns to the training layout
    fn align(&self, features: Array2<f64>, names: &[String]) -> Result<Array2<f64>> {
        if names == self.feature_names.as_slice() {
            return Ok(features);
        }
        let mut missing = Vec::new();
        let indices: Vec<usize> = self
            .feature_names
            .iter()
            .filter_map(|name| {
                let idx = names.iter().position(|n| n == name);
                if idx.is_none() {
                    missing.push(name.as_str());
                }
                idx
            })
            .collect();
        if !missing.is_empty() {
            return Err(ExoSeekerError::Schema(format!(
                "missing feature columns: {}",
                missing.join(", ")
            )));
        }
        Ok(features.select(Axis(1), &indices))
    }
}
