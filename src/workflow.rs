//! Train, predict and evaluate actions
//!
//! Each action takes its inputs explicitly and returns a `Result`; the CLI and
//! the HTTP service decide how to present failures.

use crate::error::Result;
use crate::evaluation::{evaluate, EvaluationReport};
use crate::export::ModelStore;
use crate::preprocessing::{InferenceScaling, PreprocessingConfig, Preprocessor};
use crate::schema::Disposition;
use crate::training::{
    EstimatorSelection, Hyperparameters, TrainEngine, TrainedModel, TrainingConfig,
};
use crate::utils::write_predictions_csv;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Everything a train action needs besides the table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub selection: EstimatorSelection,
    pub hyperparameters: Hyperparameters,
    pub preprocessing: PreprocessingConfig,
    pub training: TrainingConfig,
}

impl TrainRequest {
    pub fn new(selection: EstimatorSelection, hyperparameters: Hyperparameters) -> Self {
        Self {
            selection,
            hyperparameters,
            ..Default::default()
        }
    }

    /// Use one seed for both the split and the estimators
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.preprocessing.random_state = seed;
        self.training.random_state = seed;
        self
    }
}

/// Result of a train action
#[derive(Debug, Clone, Serialize)]
pub struct TrainOutcome {
    pub report: EvaluationReport,
    pub model_path: PathBuf,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub elapsed_secs: f64,
}

/// How an inference batch is scaled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicy {
    /// Reuse the mean and scale learned on the training partition
    #[default]
    TrainingStatistics,
    /// Fit a fresh scaler on the batch being classified
    BatchStatistics,
}

impl ScalingPolicy {
    fn for_model(&self, model: &TrainedModel) -> InferenceScaling {
        match self {
            ScalingPolicy::TrainingStatistics => InferenceScaling::Fitted(model.scaler.clone()),
            ScalingPolicy::BatchStatistics => InferenceScaling::Refit,
        }
    }
}

impl std::str::FromStr for ScalingPolicy {
    type Err = crate::error::ExoSeekerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "training" | "training_statistics" | "fitted" => Ok(ScalingPolicy::TrainingStatistics),
            "batch" | "batch_statistics" | "refit" => Ok(ScalingPolicy::BatchStatistics),
            other => Err(crate::error::ExoSeekerError::Config(format!(
                "unknown scaling policy '{}' (expected training or batch)",
                other
            ))),
        }
    }
}

/// Result of a predict action
#[derive(Debug, Clone, Serialize)]
pub struct PredictOutcome {
    pub labels: Vec<Disposition>,
    pub n_confirmed: usize,
    pub n_candidate: usize,
}

impl PredictOutcome {
    pub fn new(labels: Vec<Disposition>) -> Self {
        let n_confirmed = labels.iter().filter(|l| **l == Disposition::Confirmed).count();
        let n_candidate = labels.len() - n_confirmed;
        Self {
            labels,
            n_confirmed,
            n_candidate,
        }
    }

    /// `predictions.csv` contents
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        write_predictions_csv(&self.labels)
    }
}

/// Prepare, train, evaluate on the held-out partition and persist the model
pub fn train_action(df: &DataFrame, request: &TrainRequest, store: &ModelStore) -> Result<TrainOutcome> {
    let start = Instant::now();
    request.preprocessing.validate()?;
    request.hyperparameters.validate()?;

    let preprocessor = Preprocessor::new(request.preprocessing.clone());
    let data = preprocessor.prepare_training(df)?;

    let engine = TrainEngine::new(request.training.clone());
    let stack = engine.fit(
        &data.train_features,
        &data.train_labels,
        &request.selection,
        &request.hyperparameters,
    )?;

    let model = TrainedModel::new(
        data.feature_names.clone(),
        data.scaler.clone(),
        stack,
        request.selection.clone(),
        request.hyperparameters.clone(),
        request.preprocessing.clone(),
    );
    let predicted = model.predict_features(&data.test_features)?;
    let report = evaluate(&data.test_labels, &predicted)?;

    store.save(&model)?;

    let outcome = TrainOutcome {
        report,
        model_path: store.path().to_path_buf(),
        n_train: data.train_labels.len(),
        n_test: data.test_labels.len(),
        n_features: data.feature_names.len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    info!(
        n_train = outcome.n_train,
        n_test = outcome.n_test,
        accuracy = outcome.report.metrics.accuracy,
        f1 = outcome.report.metrics.f1,
        elapsed_secs = outcome.elapsed_secs,
        "Train action finished"
    );
    Ok(outcome)
}

/// Classify every row of an unlabeled table with the stored model
pub fn predict_action(
    df: &DataFrame,
    store: &ModelStore,
    scaling: ScalingPolicy,
) -> Result<PredictOutcome> {
    let model = store.load()?;
    let labels = model.predict(df, &scaling.for_model(&model))?;
    let outcome = PredictOutcome::new(labels);
    info!(
        rows = outcome.labels.len(),
        confirmed = outcome.n_confirmed,
        candidate = outcome.n_candidate,
        scaling = ?scaling,
        "Predict action finished"
    );
    Ok(outcome)
}

/// Score the stored model on a labeled table without retraining
pub fn evaluate_action(df: &DataFrame, store: &ModelStore) -> Result<EvaluationReport> {
    let model = store.load()?;
    let preprocessor = Preprocessor::new(model.preprocessing.clone());
    let data = preprocessor.prepare_labeled(df, &model.scaler)?;
    let predicted = model.predict_features(&data.features)?;
    let report = evaluate(&data.labels, &predicted)?;
    info!(
        rows = data.labels.len(),
        accuracy = report.metrics.accuracy,
        "Evaluate action finished"
    );
    Ok(report)
}
