//! Seeded train/test partitioning

use crate::error::{ExoSeekerError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Partition `0..n_samples` into train and test index sets.
///
/// `n_train = floor(train_fraction * n_samples)`, the rest go to test.
pub fn train_test_split(
    n_samples: usize,
    train_fraction: f64,
    shuffle: bool,
    random_state: u64,
) -> Result<TrainTestSplit> {
    // The epsilon keeps e.g. 0.7 * 10 from flooring to 6
    let n_train = (train_fraction * n_samples as f64 + 1e-9).floor() as usize;
    let n_test = n_samples.saturating_sub(n_train);

    if n_train == 0 || n_test == 0 {
        return Err(ExoSeekerError::EmptyDataset(format!(
            "{} rows cannot be split into non-empty train ({}) and test ({}) partitions",
            n_samples, n_train, n_test
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    if shuffle {
        let mut rng = ChaCha8Rng::seed_from_u64(random_state);
        indices.shuffle(&mut rng);
    }

    let test_indices = indices.split_off(n_train);
    Ok(TrainTestSplit {
        train_indices: indices,
        test_indices,
    })
}
