//! Classification metrics derived from confusion counts
//!
//! Every metric is 0.0 when its denominator is zero.

use super::confusion::{classify, ConfusionCounts, ConfusionMatrix};
use crate::error::Result;
use crate::schema::Disposition;
use serde::{Deserialize, Serialize};
use std::fmt;

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ConfusionCounts {
    /// (tp + tn) / total
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Recall on the positive class: tp / (tp + fn)
    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// tn / (tn + fp)
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// tp / (tp + fp)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.sensitivity();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            accuracy: self.accuracy(),
            sensitivity: self.sensitivity(),
            specificity: self.specificity(),
            precision: self.precision(),
            f1: self.f1(),
        }
    }
}

/// The five headline metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
    pub f1: f64,
}

impl MetricsSummary {
    /// (label, formatted value) pairs: percentages for rates, a fraction for F1
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Accuracy", format!("{:.2}%", self.accuracy * 100.0)),
            ("Sensitivity", format!("{:.2}%", self.sensitivity * 100.0)),
            ("Specificity", format!("{:.2}%", self.specificity * 100.0)),
            ("Precision", format!("{:.2}%", self.precision * 100.0)),
            ("F1 Score", format!("{:.4}", self.f1)),
        ]
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.display_rows() {
            writeln!(f, "{:<12} {}", label, value)?;
        }
        Ok(())
    }
}

/// Counts, metrics and the confusion matrix of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub counts: ConfusionCounts,
    pub metrics: MetricsSummary,
    pub confusion_matrix: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn from_counts(counts: ConfusionCounts) -> Self {
        Self {
            metrics: counts.summary(),
            confusion_matrix: ConfusionMatrix::from_counts(&counts),
            counts,
        }
    }
}

/// Evaluate predicted dispositions against actual ones with CONFIRMED as positive
pub fn evaluate(actual: &[Disposition], predicted: &[Disposition]) -> Result<EvaluationReport> {
    let counts = classify(actual, predicted, &Disposition::POSITIVE)?;
    Ok(EvaluationReport::from_counts(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExoSeekerError;

    #[test]
    fn test_balanced_metrics() {
        let summary = ConfusionCounts::new(1, 1, 1, 1).summary();
        assert_eq!(summary.accuracy, 0.5);
        assert_eq!(summary.sensitivity, 0.5);
        assert_eq!(summary.specificity, 0.5);
        assert_eq!(summary.precision, 0.5);
        assert_eq!(summary.f1, 0.5);
    }

    #[test]
    fn test_zero_denominators() {
        // Two candidates predicted correctly: no positives anywhere
        let counts = ConfusionCounts::new(0, 0, 0, 2);
        assert_eq!(counts.accuracy(), 1.0);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.sensitivity(), 0.0);
        assert_eq!(counts.specificity(), 1.0);
        assert_eq!(counts.f1(), 0.0);

        assert_eq!(ConfusionCounts::default().accuracy(), 0.0);
    }

    #[test]
    fn test_f1() {
        let counts = ConfusionCounts::new(8, 2, 4, 6);
        let p = 8.0 / 12.0;
        let r = 8.0 / 10.0;
        assert!((counts.f1() - 2.0 * p * r / (p + r)).abs() < 1e-12);
    }

    #[test]
    fn test_display_format() {
        let summary = ConfusionCounts::new(2, 1, 0, 3).summary();
        let rows = summary.display_rows();
        assert_eq!(rows[0], ("Accuracy", "83.33%".to_string()));
        assert_eq!(rows[3], ("Precision", "100.00%".to_string()));
        assert_eq!(rows[4], ("F1 Score", "0.8000".to_string()));
    }

    #[test]
    fn test_evaluate_report() {
        use Disposition::*;
        let report = evaluate(&[Confirmed, Candidate], &[Confirmed, Confirmed]).unwrap();
        assert_eq!(report.counts, ConfusionCounts::new(1, 0, 1, 0));
        assert_eq!(report.confusion_matrix.counts(), [[0, 1], [0, 1]]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["counts"]["fn"], 0);
        assert_eq!(json["metrics"]["precision"], 0.5);
    }

    #[test]
    fn test_evaluate_length_mismatch() {
        let err = evaluate(&[Disposition::Confirmed], &[]).unwrap_err();
        assert!(matches!(err, ExoSeekerError::LengthMismatch { .. }));
    }
}
