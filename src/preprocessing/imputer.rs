//! Missing value imputation strategies

use crate::error::{ExoSeekerError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column mean (numeric only)
    Mean,
    /// Replace with the most frequent value, ties go to the smallest value
    MostFrequent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
    /// Column had no observed values to learn from
    Missing,
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: BTreeMap<String, ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Learn a fill value for each named column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                ExoSeekerError::Schema(format!("missing column: {}", col_name))
            })?;
            let fill_value = self.compute_fill_value(column.as_materialized_series())?;
            self.fill_values.insert(col_name.clone(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace nulls in every fitted column present in `df`
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ExoSeekerError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill_value) in &self.fill_values {
            if let Ok(column) = df.column(col_name) {
                let series = column.as_materialized_series();
                if series.null_count() == 0 {
                    continue;
                }
                let filled = Self::fill_series(series, fill_value)?;
                result.with_column(filled)?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Learned fill value for a string column
    pub fn string_fill(&self, column: &str) -> Option<&str> {
        match self.fill_values.get(column) {
            Some(ImputeValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Check if dtype can be imputed as a number
    pub fn is_numeric_dtype(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
                | DataType::Null
        )
    }

    /// Most frequent non-null string; the BTreeMap walk makes the smallest value win ties
    fn compute_mode_string(series: &Series) -> Result<Option<String>> {
        let as_str = series.cast(&DataType::String)?;
        let ca = as_str.str()?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for val in ca.into_iter().flatten() {
            *counts.entry(val).or_insert(0) += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for (val, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((val, count));
            }
        }
        Ok(best.map(|(v, _)| v.to_string()))
    }

    fn compute_fill_value(&self, series: &Series) -> Result<ImputeValue> {
        match self.strategy {
            ImputeStrategy::Mean => {
                if !Self::is_numeric_dtype(series.dtype()) {
                    return Err(ExoSeekerError::Schema(format!(
                        "column '{}' is not numeric (found {})",
                        series.name(),
                        series.dtype()
                    )));
                }
                let as_f64 = series.cast(&DataType::Float64)?;
                // A column with no observed values falls back to 0.0
                let mean = as_f64.f64()?.mean().unwrap_or(0.0);
                Ok(ImputeValue::Numeric(mean))
            }
            ImputeStrategy::MostFrequent => Ok(Self::compute_mode_string(series)?
                .map(ImputeValue::String)
                .unwrap_or(ImputeValue::Missing)),
        }
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        match fill_value {
            ImputeValue::Numeric(fill) => {
                let as_f64 = series.cast(&DataType::Float64)?;
                let filled: Float64Chunked = as_f64
                    .f64()?
                    .into_iter()
                    .map(|v| Some(v.unwrap_or(*fill)))
                    .collect();
                Ok(filled.with_name(series.name().clone()).into_series())
            }
            ImputeValue::String(fill) => {
                let as_str = series.cast(&DataType::String)?;
                let filled: StringChunked = as_str
                    .str()?
                    .into_iter()
                    .map(|v| Some(v.unwrap_or(fill.as_str())))
                    .collect();
                Ok(filled.with_name(series.name().clone()).into_series())
            }
            ImputeValue::Missing => Ok(series.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_imputation() {
        let df = df! {
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [Some(1i64), Some(2), None],
        }
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let out = imputer
            .fit_transform(&df, &["a".to_string(), "b".to_string()])
            .unwrap();

        assert_eq!(out.column("a").unwrap().null_count(), 0);
        assert_eq!(out.column("b").unwrap().null_count(), 0);
        let a = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(a.get(1), Some(2.0));
        let b = out.column("b").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(b.get(2), Some(1.5));
    }

    #[test]
    fn test_all_null_column_fills_zero() {
        let df = df! { "a" => [None::<f64>, None] }.unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let out = imputer.fit_transform(&df, &["a".to_string()]).unwrap();
        assert_eq!(out.column("a").unwrap().null_count(), 0);
        let a = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(a.get(0), Some(0.0));
        assert_eq!(a.get(1), Some(0.0));
    }

    #[test]
    fn test_mean_rejects_strings() {
        let df = df! { "a" => ["x", "y"] }.unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let err = imputer.fit(&df, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, ExoSeekerError::Schema(_)));
    }

    #[test]
    fn test_mode_imputation_breaks_ties_lexicographically() {
        let df = df! {
            "name" => [Some("q1_q17_dr25"), Some("q1_q16"), None, Some("q1_q16"), Some("q1_q17_dr25")],
        }
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let out = imputer.fit_transform(&df, &["name".to_string()]).unwrap();

        assert_eq!(imputer.string_fill("name"), Some("q1_q16"));
        let col = out.column("name").unwrap().as_materialized_series().str().unwrap().clone();
        assert_eq!(col.get(2), Some("q1_q16"));
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df! { "a" => [1.0] }.unwrap();
        let imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(matches!(imputer.transform(&df), Err(ExoSeekerError::ModelNotFitted)));
    }
}
