//! ExoSeeker - Kepler exoplanet disposition classifier
//!
//! Cleans the Kepler cumulative KOI table, trains a stacked ensemble that
//! separates `CONFIRMED` exoplanets from `CANDIDATE`s, evaluates it on a
//! held-out partition and classifies new tables.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`preprocessing`] - Schema validation, row filtering, imputation, split, scaling
//! - [`training`] - Base estimators and the training entry point
//! - [`ensemble`] - Stacking with a logistic regression combiner
//! - [`evaluation`] - Confusion counts, metrics and the confusion matrix
//! - [`export`] - Single-slot model persistence
//! - [`workflow`] - Train, predict and evaluate actions
//!
//! ## Services
//! - [`server`] - HTTP server with REST API and web UI
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod schema;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod ensemble;
pub mod evaluation;

// Persistence and orchestration
pub mod export;
pub mod utils;
pub mod workflow;

// Services
pub mod server;
pub mod cli;

pub use error::{ExoSeekerError, Result};

/// Crate version recorded on every trained model
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ExoSeekerError, Result};

    // Schema
    pub use crate::schema::Disposition;

    // Preprocessing
    pub use crate::preprocessing::{InferenceScaling, Mode, PreprocessingConfig, Preprocessor, StandardScaler};

    // Training
    pub use crate::training::{train, EstimatorKind, EstimatorSelection, Hyperparameters, TrainedModel, TrainingConfig};

    // Ensemble
    pub use crate::ensemble::{StackingClassifier, StackingConfig};

    // Evaluation
    pub use crate::evaluation::{classify, ConfusionCounts, ConfusionMatrix, EvaluationReport, MetricsSummary};

    // Persistence and actions
    pub use crate::export::ModelStore;
    pub use crate::utils::DataLoader;
    pub use crate::workflow::{evaluate_action, predict_action, train_action, ScalingPolicy, TrainRequest};
}
