//! Catalog preprocessing pipeline
//!
//! Turns a raw KOI table into scaled feature matrices. Training mode
//! validates the schema, drops `FALSE POSITIVE` rows, imputes, prunes the
//! non-feature columns, splits and scales. Inference mode runs the same
//! cleaning without the label handling and the split.

use super::{
    config::PreprocessingConfig,
    imputer::{ImputeStrategy, Imputer},
    scaler::StandardScaler,
    split::train_test_split,
};
use crate::error::{ExoSeekerError, Result};
use crate::schema::{self, Disposition, DELIVERY_NAME_COLUMN, LABEL_COLUMN};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// How the inference batch is scaled
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceScaling {
    /// Fit a fresh scaler on the batch itself
    Refit,
    /// Reuse the scaler fitted during training
    Fitted(StandardScaler),
}

/// Pipeline mode
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Train,
    Infer(InferenceScaling),
}

/// Output of training-mode preprocessing
#[derive(Debug, Clone)]
pub struct PreparedTrainingData {
    pub train_features: Array2<f64>,
    pub test_features: Array2<f64>,
    pub train_labels: Vec<Disposition>,
    pub test_labels: Vec<Disposition>,
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
}

/// Output of inference-mode preprocessing
#[derive(Debug, Clone)]
pub struct PreparedInferenceData {
    pub features: Array2<f64>,
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
}

/// A labeled table scaled with an existing scaler, no split
#[derive(Debug, Clone)]
pub struct PreparedLabeledData {
    pub features: Array2<f64>,
    pub labels: Vec<Disposition>,
    pub feature_names: Vec<String>,
}

/// Result of [`Preprocessor::prepare`]
#[derive(Debug, Clone)]
pub enum PreparedData {
    Training(PreparedTrainingData),
    Inference(PreparedInferenceData),
}

/// Cleaned table before splitting and scaling
struct CleanTable {
    features: Array2<f64>,
    labels: Option<Vec<Disposition>>,
    feature_names: Vec<String>,
}

/// Preprocessing pipeline for KOI tables
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Run the pipeline in the given mode
    pub fn prepare(&self, df: &DataFrame, mode: Mode) -> Result<PreparedData> {
        match mode {
            Mode::Train => self.prepare_training(df).map(PreparedData::Training),
            Mode::Infer(scaling) => self
                .prepare_inference(df, &scaling)
                .map(PreparedData::Inference),
        }
    }

    /// Clean, split and scale a labeled table
    pub fn prepare_training(&self, df: &DataFrame) -> Result<PreparedTrainingData> {
        self.config.validate()?;
        let start = Instant::now();

        let clean = self.clean(df, true, None)?;
        let labels = clean.labels.unwrap_or_default();
        let n_rows = clean.features.nrows();

        let split = train_test_split(
            n_rows,
            self.config.train_fraction,
            self.config.shuffle,
            self.config.random_state,
        )?;

        let train_raw = clean.features.select(Axis(0), &split.train_indices);
        let test_raw = clean.features.select(Axis(0), &split.test_indices);
        let train_labels: Vec<Disposition> =
            split.train_indices.iter().map(|&i| labels[i]).collect();
        let test_labels: Vec<Disposition> =
            split.test_indices.iter().map(|&i| labels[i]).collect();

        // Statistics come from the training partition only
        let mut scaler = StandardScaler::new();
        let train_features = scaler.fit_transform(&train_raw, &clean.feature_names)?;
        let test_features = scaler.transform(&test_raw)?;

        info!(
            rows = n_rows,
            n_train = train_labels.len(),
            n_test = test_labels.len(),
            n_features = clean.feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prepared training data"
        );

        Ok(PreparedTrainingData {
            train_features,
            test_features,
            train_labels,
            test_labels,
            feature_names: clean.feature_names,
            scaler,
        })
    }

    /// Clean and scale an unlabeled table
    pub fn prepare_inference(
        &self,
        df: &DataFrame,
        scaling: &InferenceScaling,
    ) -> Result<PreparedInferenceData> {
        let start = Instant::now();

        let (clean, scaler) = match scaling {
            InferenceScaling::Refit => {
                let clean = self.clean(df, false, None)?;
                let mut scaler = StandardScaler::new();
                scaler.fit(&clean.features, &clean.feature_names)?;
                (clean, scaler)
            }
            InferenceScaling::Fitted(scaler) => {
                let order = scaler.feature_names();
                (self.clean(df, false, Some(&order))?, scaler.clone())
            }
        };

        let features = scaler.transform(&clean.features)?;

        info!(
            rows = features.nrows(),
            n_features = clean.feature_names.len(),
            refit = matches!(scaling, InferenceScaling::Refit),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prepared inference data"
        );

        Ok(PreparedInferenceData {
            features,
            feature_names: clean.feature_names,
            scaler,
        })
    }

    /// Clean a labeled table without splitting and scale it with `scaler`
    pub fn prepare_labeled(
        &self,
        df: &DataFrame,
        scaler: &StandardScaler,
    ) -> Result<PreparedLabeledData> {
        let order = scaler.feature_names();
        let clean = self.clean(df, true, Some(&order))?;
        let features = scaler.transform(&clean.features)?;

        Ok(PreparedLabeledData {
            features,
            labels: clean.labels.unwrap_or_default(),
            feature_names: clean.feature_names,
        })
    }

    fn clean(
        &self,
        df: &DataFrame,
        labeled: bool,
        feature_order: Option<&[String]>,
    ) -> Result<CleanTable> {
        validate_schema(df, labeled)?;

        let (df, labels) = if labeled {
            let (filtered, labels) = filter_false_positives(df)?;
            (filtered, Some(labels))
        } else {
            if df.height() == 0 {
                return Err(ExoSeekerError::EmptyDataset(
                    "input table has no rows".to_string(),
                ));
            }
            (df.clone(), None)
        };

        let mut mode_imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let df = mode_imputer.fit_transform(&df, &[DELIVERY_NAME_COLUMN.to_string()])?;
        debug!(fill = ?mode_imputer.string_fill(DELIVERY_NAME_COLUMN), "Filled delivery name");

        let feature_names = select_feature_columns(&df, feature_order)?;
        let df = cast_empty_columns(df, &feature_names)?;
        check_numeric(&df, &feature_names)?;

        let mut mean_imputer = Imputer::new(ImputeStrategy::Mean);
        let df = mean_imputer.fit_transform(&df, &feature_names)?;

        // Identifier, auxiliary, delivery name and label columns fall away here
        let features = to_feature_matrix(&df, &feature_names)?;

        Ok(CleanTable {
            features,
            labels,
            feature_names,
        })
    }
}

/// Check that every schema column exists, listing all that are missing
fn validate_schema(df: &DataFrame, labeled: bool) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let mut required = schema::required_columns();
    if labeled {
        required.push(LABEL_COLUMN);
    }

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|c| !present.iter().any(|p| p == c))
        .collect();

    if !missing.is_empty() {
        return Err(ExoSeekerError::Schema(format!(
            "missing columns: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Parse the label column and drop `FALSE POSITIVE` rows, keeping row order
fn filter_false_positives(df: &DataFrame) -> Result<(DataFrame, Vec<Disposition>)> {
    let labels_series = df
        .column(LABEL_COLUMN)?
        .as_materialized_series()
        .cast(&DataType::String)?;

    let mut parsed = Vec::with_capacity(df.height());
    for (row, value) in labels_series.str()?.into_iter().enumerate() {
        let value = value.ok_or_else(|| {
            ExoSeekerError::Schema(format!("missing {} value at row {}", LABEL_COLUMN, row))
        })?;
        parsed.push(value.parse::<Disposition>()?);
    }

    let mask: BooleanChunked = parsed
        .iter()
        .map(|d| Some(*d != Disposition::FalsePositive))
        .collect();
    let filtered = df.filter(&mask)?;
    let kept: Vec<Disposition> = parsed
        .into_iter()
        .filter(|d| *d != Disposition::FalsePositive)
        .collect();

    debug!(
        before = df.height(),
        after = filtered.height(),
        "Removed FALSE POSITIVE rows"
    );

    if kept.is_empty() {
        return Err(ExoSeekerError::EmptyDataset(
            "no CONFIRMED or CANDIDATE rows remain after removing FALSE POSITIVE".to_string(),
        ));
    }
    Ok((filtered, kept))
}

/// Feature columns in file order, or in `order` when given
fn select_feature_columns(df: &DataFrame, order: Option<&[String]>) -> Result<Vec<String>> {
    let names: Vec<String> = match order {
        Some(order) => {
            let missing: Vec<&str> = order
                .iter()
                .filter(|name| df.column(name.as_str()).is_err())
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(ExoSeekerError::Schema(format!(
                    "missing feature columns seen during training: {}",
                    missing.join(", ")
                )));
            }
            order.to_vec()
        }
        None => df
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .filter(|c| !schema::is_non_feature_column(c))
            .collect(),
    };

    if names.is_empty() {
        return Err(ExoSeekerError::Schema("no feature columns".to_string()));
    }
    Ok(names)
}

/// CSV readers type a column with no values as strings; such columns are
/// numeric features waiting for the 0.0 fill
fn cast_empty_columns(mut df: DataFrame, names: &[String]) -> Result<DataFrame> {
    let height = df.height();
    for name in names {
        let column = df.column(name)?;
        if column.null_count() == height && !Imputer::is_numeric_dtype(column.dtype()) {
            let cast = column.cast(&DataType::Float64)?;
            df.with_column(cast)?;
            debug!(column = %name, "Typed empty column as Float64");
        }
    }
    Ok(df)
}

fn check_numeric(df: &DataFrame, names: &[String]) -> Result<()> {
    let non_numeric: Vec<String> = names
        .iter()
        .filter_map(|name| {
            let dtype = df.column(name).ok()?.dtype().clone();
            (!Imputer::is_numeric_dtype(&dtype)).then(|| format!("{} ({})", name, dtype))
        })
        .collect();
    if !non_numeric.is_empty() {
        return Err(ExoSeekerError::Schema(format!(
            "non-numeric feature columns: {}",
            non_numeric.join(", ")
        )));
    }
    Ok(())
}

fn to_feature_matrix(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let mut x = Array2::<f64>::zeros((df.height(), names.len()));
    for (j, name) in names.iter().enumerate() {
        let series = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        for (i, value) in series.f64()?.into_iter().enumerate() {
            x[[i, j]] = value.ok_or_else(|| {
                ExoSeekerError::Data(format!("null left in '{}' at row {}", name, i))
            })?;
        }
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table() -> DataFrame {
        df! {
            "loc_rowid" => [1i64, 2, 3, 4, 5, 6],
            "kepid" => [10i64, 11, 12, 13, 14, 15],
            "kepoi_name" => ["K1", "K2", "K3", "K4", "K5", "K6"],
            "kepler_name" => [Some("Kepler-1 b"), None, None, Some("Kepler-4 b"), None, None],
            "koi_disposition" => ["CONFIRMED", "CANDIDATE", "FALSE POSITIVE", "CONFIRMED", "CANDIDATE", "CANDIDATE"],
            "koi_pdisposition" => ["CANDIDATE", "CANDIDATE", "FALSE POSITIVE", "CANDIDATE", "CANDIDATE", "CANDIDATE"],
            "koi_score" => [1.0, 0.5, 0.0, 0.9, 0.4, 0.3],
            "koi_period" => [Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)],
            "koi_depth" => [10i64, 20, 30, 40, 50, 60],
            "koi_teq_err1" => [None::<f64>, None, None, None, None, None],
            "koi_teq_err2" => [None::<f64>, None, None, None, None, None],
            "koi_tce_delivname" => [Some("q1_q17_dr25_tce"), None, Some("q1_q17_dr25_tce"), Some("q1_q16_tce"), None, Some("q1_q17_dr25_tce")],
        }
        .unwrap()
    }

    #[test]
    fn test_training_removes_false_positives() {
        let pre = Preprocessor::new(PreprocessingConfig::default().with_train_fraction(0.6));
        let data = pre.prepare_training(&raw_table()).unwrap();

        assert_eq!(data.train_labels.len() + data.test_labels.len(), 5);
        assert_eq!(data.train_labels.len(), 3);
        assert!(data
            .train_labels
            .iter()
            .chain(data.test_labels.iter())
            .all(|d| *d != Disposition::FalsePositive));
        assert_eq!(data.feature_names, vec!["koi_period", "koi_depth"]);
        assert_eq!(data.train_features.ncols(), 2);
        assert!(data.train_features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_missing_columns_are_all_listed() {
        let df = df! { "koi_period" => [1.0] }.unwrap();
        let err = Preprocessor::default().prepare_training(&df).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("kepid"));
        assert!(msg.contains("koi_teq_err2"));
        assert!(msg.contains("koi_disposition"));
    }

    #[test]
    fn test_only_false_positives_is_empty() {
        let df = raw_table();
        let mask: BooleanChunked = [false, false, true, false, false, false]
            .iter()
            .map(|b| Some(*b))
            .collect();
        let only_fp = df.filter(&mask).unwrap();
        let err = Preprocessor::default().prepare_training(&only_fp).unwrap_err();
        assert!(matches!(err, ExoSeekerError::EmptyDataset(_)));
    }

    #[test]
    fn test_unknown_label_is_schema_error() {
        let mut df = raw_table();
        df.with_column(Series::new(
            "koi_disposition".into(),
            ["CONFIRMED", "CANDIDATE", "MAYBE", "CONFIRMED", "CANDIDATE", "CANDIDATE"],
        ))
        .unwrap();
        let err = Preprocessor::default().prepare_training(&df).unwrap_err();
        assert!(matches!(err, ExoSeekerError::Schema(m) if m.contains("MAYBE")));
    }

    #[test]
    fn test_inference_refit_keeps_every_row() {
        let mut df = raw_table();
        let _ = df.drop_in_place(LABEL_COLUMN).unwrap();
        let data = Preprocessor::default()
            .prepare_inference(&df, &InferenceScaling::Refit)
            .unwrap();
        assert_eq!(data.features.nrows(), 6);
        assert_eq!(data.feature_names, vec!["koi_period", "koi_depth"]);
    }

    #[test]
    fn test_inference_with_fitted_scaler_reorders_columns() {
        let pre = Preprocessor::new(PreprocessingConfig::default().with_train_fraction(0.6));
        let training = pre.prepare_training(&raw_table()).unwrap();

        let df = raw_table()
            .select([
                "loc_rowid", "kepid", "kepoi_name", "kepler_name", "koi_pdisposition",
                "koi_score", "koi_depth", "koi_period", "koi_teq_err1", "koi_teq_err2",
                "koi_tce_delivname",
            ])
            .unwrap();
        let data = pre
            .prepare_inference(&df, &InferenceScaling::Fitted(training.scaler.clone()))
            .unwrap();
        assert_eq!(data.feature_names, training.feature_names);
        assert_eq!(data.scaler, training.scaler);
    }

    #[test]
    fn test_inference_missing_training_feature() {
        let pre = Preprocessor::new(PreprocessingConfig::default().with_train_fraction(0.6));
        let training = pre.prepare_training(&raw_table()).unwrap();

        let mut df = raw_table();
        let _ = df.drop_in_place("koi_depth").unwrap();
        let err = pre
            .prepare_inference(&df, &InferenceScaling::Fitted(training.scaler))
            .unwrap_err();
        assert!(matches!(err, ExoSeekerError::Schema(m) if m.contains("koi_depth")));
    }

    #[test]
    fn test_non_numeric_feature_is_schema_error() {
        let mut df = raw_table();
        df.with_column(Series::new("koi_comment".into(), ["a", "b", "c", "d", "e", "f"]))
            .unwrap();
        let err = Preprocessor::default().prepare_training(&df).unwrap_err();
        assert!(matches!(err, ExoSeekerError::Schema(m) if m.contains("koi_comment")));
    }

    #[test]
    fn test_empty_string_column_is_numeric() {
        let mut df = raw_table();
        df.with_column(Series::new("koi_prad".into(), [None::<&str>; 6]))
            .unwrap();
        let pre = Preprocessor::new(PreprocessingConfig::default().with_train_fraction(0.6));
        let data = pre.prepare_training(&df).unwrap();

        let idx = data.feature_names.iter().position(|n| n == "koi_prad").unwrap();
        assert!(data.train_features.column(idx).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_prepare_dispatches_on_mode() {
        let pre = Preprocessor::new(PreprocessingConfig::default().with_train_fraction(0.6));
        assert!(matches!(
            pre.prepare(&raw_table(), Mode::Train).unwrap(),
            PreparedData::Training(_)
        ));
        assert!(matches!(
            pre.prepare(&raw_table(), Mode::Infer(InferenceScaling::Refit)).unwrap(),
            PreparedData::Inference(_)
        ));
    }
}
