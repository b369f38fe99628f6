//! Model evaluation
//!
//! Confusion counts with `CONFIRMED` as the positive class, the derived
//! rate metrics, and the rendered 2x2 confusion matrix.

mod confusion;
mod metrics;

pub use confusion::{classify, ConfusionCounts, ConfusionMatrix, MatrixCell};
pub use metrics::{evaluate, EvaluationReport, MetricsSummary};
