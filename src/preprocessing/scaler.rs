//! Standard (z-score) feature scaling

use crate::error::{ExoSeekerError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub name: String,
    pub center: f64, // mean
    pub scale: f64,  // population std, 1.0 for constant columns
}

/// Z-score scaler: (x - mean) / std with ddof = 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
}

impl StandardScaler {
    /// Create a new, unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit column statistics. `names` must match the column count.
    pub fn fit(&mut self, x: &Array2<f64>, names: &[String]) -> Result<&mut Self> {
        if names.len() != x.ncols() {
            return Err(ExoSeekerError::Shape {
                expected: format!("{} column names", x.ncols()),
                actual: format!("{} column names", names.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(ExoSeekerError::EmptyDataset(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        self.params = x
            .axis_iter(Axis(1))
            .zip(names)
            .map(|(col, name)| {
                let n = col.len() as f64;
                let mean = col.sum() / n;
                let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                ScalerParams {
                    name: name.clone(),
                    center: mean,
                    scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
                }
            })
            .collect();
        Ok(self)
    }

    /// Apply the fitted statistics. Columns are taken positionally.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(ExoSeekerError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut col, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            col.mapv_inplace(|v| (v - p.center) / p.scale);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>, names: &[String]) -> Result<Array2<f64>> {
        self.fit(x, names)?;
        self.transform(x)
    }

    pub fn is_fitted(&self) -> bool {
        !self.params.is_empty()
    }

    /// Fitted column names in fit order
    pub fn feature_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }
}
