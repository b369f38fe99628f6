//! Random Forest implementation

use super::decision_tree::DecisionTree;
use crate::error::{ExoSeekerError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest of bootstrap-sampled Gini trees, each split drawing from
/// floor(sqrt(n_features)) candidate features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Random state
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_leaf: 1,
            random_state: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(n_features: usize) -> usize {
        ((n_features as f64).sqrt().floor() as usize).max(1)
    }

    /// Fit the forest to binary 0/1 targets
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || self.n_estimators == 0 {
            return Err(ExoSeekerError::Fitting(
                "random forest needs samples and at least one tree".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let max_features = Self::compute_max_features(self.n_features);
        let base_seed = self.random_state.unwrap_or(42);

        // Each tree owns a seed derived from its index, so the parallel build is reproducible
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(rng.next_u64());
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(self)
    }

    /// Share of trees voting for the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ExoSeekerError::ModelNotFitted);
        }

        let votes: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut share = Array1::<f64>::zeros(x.nrows());
        for v in &votes {
            share += v;
        }
        Ok(share / self.trees.len() as f64)
    }

    /// Majority vote
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((120, 4), |(i, j)| {
            if j == 0 { i as f64 } else { ((i * (j + 3)) % 17) as f64 }
        });
        let y: Array1<f64> = (0..120).map(|i| if i >= 60 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_random_forest_classifier() {
        let (x, y) = create_classification_data();
        let mut rf = RandomForest::new_classifier(25)
            .with_max_depth(4)
            .with_random_state(42);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.n_trees(), 25);
        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.7, "Accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_probabilities_are_vote_shares() {
        let (x, y) = create_classification_data();
        let mut rf = RandomForest::new_classifier(8).with_max_depth(1).with_random_state(1);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        for p in proba.iter() {
            assert!((0.0..=1.0).contains(p));
            let scaled = p * 8.0;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
        assert!(rf.trees().iter().all(|t| t.get_depth() <= 1));
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (x, y) = create_classification_data();
        let fit = || {
            let mut rf = RandomForest::new_classifier(10).with_max_depth(2).with_random_state(42);
            rf.fit(&x, &y).unwrap();
            rf.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(), fit());
    }

    #[test]
    fn test_max_features_sqrt() {
        assert_eq!(RandomForest::compute_max_features(37), 6);
        assert_eq!(RandomForest::compute_max_features(1), 1);
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForest::new_classifier(3);
        assert!(matches!(
            rf.predict_proba(&Array2::zeros((1, 2))),
            Err(ExoSeekerError::ModelNotFitted)
        ));
    }
}
