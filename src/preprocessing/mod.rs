//! Data preprocessing module
//!
//! Cleans raw KOI tables into scaled feature matrices:
//! - Schema validation and identifier pruning
//! - `FALSE POSITIVE` row removal
//! - Mode and mean imputation
//! - Seeded train/test partitioning
//! - Standard scaling fitted on the training partition

mod config;
mod imputer;
mod pipeline;
mod scaler;
mod split;

pub use config::PreprocessingConfig;
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::{
    InferenceScaling, Mode, PreparedData, PreparedInferenceData, PreparedLabeledData,
    PreparedTrainingData, Preprocessor,
};
pub use scaler::{ScalerParams, StandardScaler};
pub use split::{train_test_split, TrainTestSplit};
