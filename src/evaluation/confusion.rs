//! Confusion counting and the 2x2 confusion matrix

use crate::error::{ExoSeekerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Agreement counts against a fixed positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub fp: usize,
    pub tn: usize,
}

impl ConfusionCounts {
    pub fn new(tp: usize, fn_: usize, fp: usize, tn: usize) -> Self {
        Self { tp, fn_, fp, tn }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fn_ + self.fp + self.tn
    }
}

/// Count (tp, fn, fp, tn) over paired labels in a single pass
pub fn classify<T: PartialEq>(actual: &[T], predicted: &[T], positive: &T) -> Result<ConfusionCounts> {
    if actual.len() != predicted.len() {
        return Err(ExoSeekerError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }

    let mut counts = ConfusionCounts::default();
    for (a, p) in actual.iter().zip(predicted) {
        match (a == positive, p == positive) {
            (true, true) => counts.tp += 1,
            (true, false) => counts.fn_ += 1,
            (false, true) => counts.fp += 1,
            (false, false) => counts.tn += 1,
        }
    }
    Ok(counts)
}

/// One cell of the confusion matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub name: String,
    pub count: usize,
    /// Count divided by the total sample count
    pub normalized: f64,
}

/// Rows are actual (CANDIDATE, CONFIRMED), columns are predicted in the same order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub cells: [[MatrixCell; 2]; 2],
    pub total: usize,
}

impl ConfusionMatrix {
    pub const ROW_LABELS: [&'static str; 2] = ["CANDIDATE", "CONFIRMED"];

    pub fn from_counts(counts: &ConfusionCounts) -> Self {
        let total = counts.total();
        let cell = |name: &str, count: usize| MatrixCell {
            name: name.to_string(),
            count,
            normalized: if total == 0 { 0.0 } else { count as f64 / total as f64 },
        };
        Self {
            cells: [
                [cell("True Neg", counts.tn), cell("False Pos", counts.fp)],
                [cell("False Neg", counts.fn_), cell("True Pos", counts.tp)],
            ],
            total,
        }
    }

    /// Raw counts as `[[tn, fp], [fn, tp]]`
    pub fn counts(&self) -> [[usize; 2]; 2] {
        [
            [self.cells[0][0].count, self.cells[0][1].count],
            [self.cells[1][0].count, self.cells[1][1].count],
        ]
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12}{:>22}{:>22}", "actual\\pred", Self::ROW_LABELS[0], Self::ROW_LABELS[1])?;
        for (label, row) in Self::ROW_LABELS.iter().zip(self.cells.iter()) {
            write!(f, "{:<12}", label)?;
            for cell in row {
                let text = format!("{} {} ({:.2}%)", cell.name, cell.count, cell.normalized * 100.0);
                write!(f, "{:>22}", text)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
