//! Single-slot model persistence

use crate::error::{ExoSeekerError, Result};
use crate::training::TrainedModel;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default location of the model slot
pub const DEFAULT_MODEL_PATH: &str = "model.json";

/// Environment variable overriding the model slot location
pub const MODEL_PATH_ENV: &str = "EXOSEEKER_MODEL_PATH";

/// One JSON file holding the most recently trained model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    path: PathBuf,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

impl ModelStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Slot from `EXOSEEKER_MODEL_PATH`, falling back to `model.json`
    pub fn from_env() -> Self {
        std::env::var(MODEL_PATH_ENV)
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the model, replacing whatever the slot held before
    pub fn save(&self, model: &TrainedModel) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        let written = Self::write_json(&tmp_path, model).and_then(|()| {
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        });
        if let Err(e) = written {
            // The slot keeps its previous model; only the partial file goes
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                warn!(path = %tmp_path.display(), error = %cleanup, "Could not remove partial model file");
            }
            return Err(e);
        }

        info!(path = %self.path.display(), "Saved model");
        Ok(())
    }

    /// Read the model back; an empty slot is `ModelNotFound`
    pub fn load(&self) -> Result<TrainedModel> {
        if !self.exists() {
            return Err(ExoSeekerError::ModelNotFound(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        let model: TrainedModel = serde_json::from_reader(BufReader::new(file))?;
        info!(
            path = %self.path.display(),
            trained_at = %model.trained_at,
            "Loaded model"
        );
        Ok(model)
    }

    fn write_json(path: &Path, model: &TrainedModel) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, model)?;
        writer.flush()?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{BaseEstimator, StackingClassifier, StackingConfig};
    use crate::preprocessing::{PreprocessingConfig, StandardScaler};
    use crate::training::{EstimatorSelection, Hyperparameters, RandomForest};
    use ndarray::{Array1, Array2};
    use tempfile::tempdir;

    fn tiny_model(seed: u64) -> TrainedModel {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| (i + j) as f64);
        let y = Array1::from_shape_fn(20, |i| if i >= 10 { 1.0 } else { 0.0 });
        let forest = RandomForest::new_classifier(3).with_max_depth(2).with_random_state(seed);
        let mut stack = StackingClassifier::new(
            StackingConfig { seed: Some(seed), ..Default::default() },
            vec![BaseEstimator::RandomForest(forest)],
        );
        stack.fit(&x, &y).unwrap();
        let names = vec!["a".to_string(), "b".to_string()];
        let mut scaler = StandardScaler::new();
        scaler.fit(&x, &names).unwrap();
        TrainedModel::new(
            names,
            scaler,
            stack,
            EstimatorSelection::new(),
            Hyperparameters::default(),
            PreprocessingConfig::default(),
        )
    }

    #[test]
    fn test_load_empty_slot() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.json"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(ExoSeekerError::ModelNotFound(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("nested").join("model.json"));
        let model = tiny_model(1);
        store.save(&model).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.feature_names, model.feature_names);
        assert_eq!(loaded.scaler, model.scaler);
        assert_eq!(loaded.trained_at, model.trained_at);

        let x = Array2::from_shape_fn((5, 2), |(i, j)| (i * 4 + j) as f64);
        assert_eq!(
            loaded.predict_features(&x).unwrap(),
            model.predict_features(&x).unwrap()
        );
        assert!(!dir.path().join("nested").join("model.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_slot() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.json"));
        store.save(&tiny_model(1)).unwrap();
        let second = tiny_model(2);
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap().trained_at, second.trained_at);
    }

    #[test]
    fn test_failed_save_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        // A non-empty directory in the slot makes the final rename fail
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let store = ModelStore::new(&path);
        assert!(matches!(store.save(&tiny_model(1)), Err(ExoSeekerError::Io(_))));
        assert!(!dir.path().join("model.json.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_corrupt_slot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"not json").unwrap();
        let store = ModelStore::new(&path);
        assert!(matches!(store.load(), Err(ExoSeekerError::Serialization(_))));
    }
}
