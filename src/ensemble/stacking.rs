//! Stacking ensemble method

use crate::error::{ExoSeekerError, Result};
use crate::training::cross_validation::CrossValidator;
use crate::training::{
    BinaryClassifier, EstimatorKind, GradientBoostingClassifier, LogisticRegression,
    MLPClassifier, RandomForest,
};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for stacking ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingConfig {
    /// Number of cross-validation folds
    pub n_folds: usize,
    /// Shuffle rows before dealing folds
    pub shuffle: bool,
    /// Random seed
    pub seed: Option<u64>,
    /// Meta-learner step size
    pub meta_learning_rate: f64,
    /// Meta-learner iterations
    pub meta_max_iter: usize,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            shuffle: false,
            seed: None,
            meta_learning_rate: 0.5,
            meta_max_iter: 2000,
        }
    }
}

/// A base learner of the stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BaseEstimator {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
    MultiLayerPerceptron(MLPClassifier),
}

impl BaseEstimator {
    pub fn kind(&self) -> EstimatorKind {
        match self {
            BaseEstimator::RandomForest(_) => EstimatorKind::RandomForest,
            BaseEstimator::GradientBoosting(_) => EstimatorKind::GradientBoosting,
            BaseEstimator::MultiLayerPerceptron(_) => EstimatorKind::MultiLayerPerceptron,
        }
    }

    fn as_classifier(&self) -> &dyn BinaryClassifier {
        match self {
            BaseEstimator::RandomForest(m) => m,
            BaseEstimator::GradientBoosting(m) => m,
            BaseEstimator::MultiLayerPerceptron(m) => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn BinaryClassifier {
        match self {
            BaseEstimator::RandomForest(m) => m,
            BaseEstimator::GradientBoosting(m) => m,
            BaseEstimator::MultiLayerPerceptron(m) => m,
        }
    }
}

impl BinaryClassifier for BaseEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_classifier_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_classifier().predict_proba(x)
    }
}

/// Stacking classifier.
///
/// Base estimators produce out-of-fold positive-class probabilities that
/// train a logistic regression meta-learner; the bases are then refit on
/// all rows for prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingClassifier {
    config: StackingConfig,
    estimators: Vec<BaseEstimator>,
    final_estimator: LogisticRegression,
    is_fitted: bool,
}

impl StackingClassifier {
    /// Create a new stacking classifier from unfitted base estimators
    pub fn new(config: StackingConfig, estimators: Vec<BaseEstimator>) -> Self {
        let final_estimator = LogisticRegression::new()
            .with_learning_rate(config.meta_learning_rate)
            .with_max_iter(config.meta_max_iter);
        Self {
            config,
            estimators,
            final_estimator,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &StackingConfig {
        &self.config
    }

    /// Base estimator kinds in stack order
    pub fn estimator_kinds(&self) -> Vec<EstimatorKind> {
        self.estimators.iter().map(BaseEstimator::kind).collect()
    }

    pub fn estimators(&self) -> &[BaseEstimator] {
        &self.estimators
    }

    pub fn final_estimator(&self) -> &LogisticRegression {
        &self.final_estimator
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit the stacking ensemble
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if self.estimators.is_empty() {
            return Err(ExoSeekerError::Config(
                "stacking needs at least one base estimator".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut cv = CrossValidator::new(self.config.n_folds).with_shuffle(self.config.shuffle);
        if let Some(seed) = self.config.seed {
            cv = cv.with_random_state(seed);
        }
        let splits = cv.split(y)?;

        let mut meta_features = Array2::<f64>::zeros((x.nrows(), self.estimators.len()));
        for (col, estimator) in self.estimators.iter_mut().enumerate() {
            let template = estimator.clone();
            for split in &splits {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train = y.select(Axis(0), &split.train_indices);
                let x_test = x.select(Axis(0), &split.test_indices);

                let mut fold_model = template.clone();
                fold_model.fit(&x_train, &y_train)?;
                let proba = fold_model.predict_proba(&x_test)?;
                for (&row, p) in split.test_indices.iter().zip(proba.iter()) {
                    meta_features[[row, col]] = *p;
                }
            }
            debug!(estimator = %estimator.kind(), folds = splits.len(), "Out-of-fold probabilities ready");

            estimator.fit(x, y)?;
        }

        self.final_estimator.fit(&meta_features, y)?;
        self.is_fitted = true;
        Ok(())
    }

    /// Positive-class probabilities from the meta-learner
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ExoSeekerError::ModelNotFitted);
        }
        let mut meta_features = Array2::<f64>::zeros((x.nrows(), self.estimators.len()));
        for (col, estimator) in self.estimators.iter().enumerate() {
            meta_features
                .column_mut(col)
                .assign(&estimator.predict_proba(x)?);
        }
        self.final_estimator.predict_proba(&meta_features)
    }

    /// Predict 0/1 labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}
