//! Preprocessing configuration

use crate::error::{ExoSeekerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the catalog preprocessing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Fraction of filtered rows assigned to the training partition
    pub train_fraction: f64,

    /// Random seed for the train/test shuffle
    pub random_state: u64,

    /// Whether to shuffle rows before partitioning
    pub shuffle: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.7,
            random_state: 42,
            shuffle: true,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the training fraction
    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    /// Builder method to set the shuffle seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to toggle shuffling
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ExoSeekerError::Config(format!(
                "train_fraction must lie strictly between 0 and 1, got {}",
                self.train_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.train_fraction, 0.7);
        assert_eq!(config.random_state, 42);
        assert!(config.shuffle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PreprocessingConfig::new()
            .with_train_fraction(0.8)
            .with_random_state(7)
            .with_shuffle(false);

        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.random_state, 7);
        assert!(!config.shuffle);
    }

    #[test]
    fn test_invalid_fraction() {
        let config = PreprocessingConfig::new().with_train_fraction(1.0);
        assert!(matches!(config.validate(), Err(ExoSeekerError::Config(_))));
    }
}
