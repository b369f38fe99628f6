//! Neural Network (Multi-Layer Perceptron) implementation
//!
//! A feedforward binary classifier with ReLU hidden layers and a softmax
//! output layer, trained by mini-batch SGD with momentum and L2
//! regularization.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExoSeekerError, Result};

/// Neural Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layer sizes
    pub hidden_layers: Vec<usize>,
    /// Learning rate
    pub learning_rate: f64,
    /// Maximum number of epochs
    pub max_epochs: usize,
    /// Batch size, capped at the sample count
    pub batch_size: usize,
    /// L2 regularization
    pub alpha: f64,
    /// Random seed
    pub random_state: Option<u64>,
    /// Epochs without `tol` improvement in training loss before stopping
    pub early_stopping_patience: usize,
    /// Minimum loss improvement
    pub tol: f64,
    /// Momentum
    pub momentum: f64,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100],
            learning_rate: 0.01,
            max_epochs: 200,
            batch_size: 200,
            alpha: 0.0001,
            random_state: Some(42),
            early_stopping_patience: 10,
            tol: 1e-4,
            momentum: 0.9,
        }
    }
}

/// Multi-Layer Perceptron Classifier for 0/1 targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    config: MLPConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    n_epochs: usize,
    loss_curve: Vec<f64>,
}

impl MLPClassifier {
    const N_OUTPUTS: usize = 2;

    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            n_epochs: 0,
            loss_curve: Vec::new(),
        }
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    /// Fit the model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ExoSeekerError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ExoSeekerError::Fitting("MLP needs at least one sample".to_string()));
        }

        self.n_features = x.ncols();
        self.loss_curve.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        self.initialize_weights(&mut rng)?;

        let y_onehot = Self::to_onehot(y);
        let batch_size = self.config.batch_size.clamp(1, n_samples);

        let mut velocities_w: Vec<Array2<f64>> =
            self.weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect();
        let mut velocities_b: Vec<Array1<f64>> =
            self.biases.iter().map(|b| Array1::zeros(b.len())).collect();

        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut indices: Vec<usize> = (0..n_samples).collect();

        for epoch in 0..self.config.max_epochs {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch_indices in indices.chunks(batch_size) {
                let x_batch = x.select(Axis(0), batch_indices);
                let y_batch = y_onehot.select(Axis(0), batch_indices);

                let (activations, z_values) = self.forward(&x_batch);
                epoch_loss += self.batch_loss(&y_batch, &activations) * batch_indices.len() as f64;

                let gradients = self.backward(&y_batch, &activations, &z_values);
                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum
                        - &grad_w * self.config.learning_rate;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum
                        - &grad_b * self.config.learning_rate;

                    self.weights[i] += &velocities_w[i];
                    self.biases[i] += &velocities_b[i];
                }
            }

            let loss = epoch_loss / n_samples as f64;
            if !loss.is_finite() {
                return Err(ExoSeekerError::Fitting(format!(
                    "MLP loss diverged at epoch {}",
                    epoch + 1
                )));
            }
            self.loss_curve.push(loss);
            self.n_epochs = epoch + 1;

            if loss > best_loss - self.config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            best_loss = best_loss.min(loss);

            if no_improvement >= self.config.early_stopping_patience {
                debug!(epoch = epoch + 1, loss, "MLP training loss plateaued");
                break;
            }
        }

        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.weights.is_empty() {
            return Err(ExoSeekerError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ExoSeekerError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let (activations, _) = self.forward(x);
        let output = activations.last().ok_or(ExoSeekerError::ModelNotFitted)?;
        Ok(output.column(1).to_owned())
    }

    /// Epochs actually run by the last fit
    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    /// Mean training loss per epoch
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) -> Result<()> {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(Self::N_OUTPUTS);

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);

            // Glorot uniform
            let scale = (6.0 / (n_in + n_out) as f64).sqrt();
            let weights: Vec<f64> = (0..n_in * n_out)
                .map(|_| rng.gen::<f64>() * 2.0 * scale - scale)
                .collect();

            self.weights.push(Array2::from_shape_vec((n_in, n_out), weights)?);
            self.biases.push(Array1::zeros(n_out));
        }
        Ok(())
    }

    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let n_layers = self.weights.len();
        let mut activations = Vec::with_capacity(n_layers + 1);
        let mut z_values = Vec::with_capacity(n_layers);
        let mut current = x.clone();

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = current.dot(w) + b;
            let a = if i + 1 < n_layers {
                Self::relu(&z)
            } else {
                Self::softmax(&z)
            };
            activations.push(current);
            z_values.push(z);
            current = a;
        }
        activations.push(current);

        (activations, z_values)
    }

    /// Cross-entropy plus the L2 penalty for one batch
    fn batch_loss(&self, y_onehot: &Array2<f64>, activations: &[Array2<f64>]) -> f64 {
        let Some(output) = activations.last() else {
            return f64::NAN;
        };
        let n = y_onehot.nrows() as f64;
        let ce = -(y_onehot * &output.mapv(|p| p.clamp(1e-10, 1.0).ln())).sum() / n;
        let l2: f64 = self.weights.iter().map(|w| w.mapv(|v| v * v).sum()).sum();
        ce + self.config.alpha * l2 / (2.0 * n)
    }

    fn backward(
        &self,
        y_onehot: &Array2<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y_onehot.nrows() as f64;
        let mut gradients = Vec::with_capacity(self.weights.len());

        // Softmax with cross-entropy
        let mut delta = (&activations[activations.len() - 1] - y_onehot) / n;

        for i in (0..self.weights.len()).rev() {
            let grad_w = activations[i].t().dot(&delta) + &self.weights[i] * (self.config.alpha / n);
            let grad_b = delta.sum_axis(Axis(0));

            if i > 0 {
                delta = delta.dot(&self.weights[i].t())
                    * Self::relu_derivative(&z_values[i - 1]);
            }
            gradients.push((grad_w, grad_b));
        }

        gradients.reverse();
        gradients
    }

    fn relu(z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| v.max(0.0))
    }

    fn relu_derivative(z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }

    fn softmax(z: &Array2<f64>) -> Array2<f64> {
        let mut result = z.clone();
        for mut row in result.rows_mut() {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }
        result
    }

    fn to_onehot(y: &Array1<f64>) -> Array2<f64> {
        let mut onehot = Array2::zeros((y.len(), Self::N_OUTPUTS));
        for (i, &label) in y.iter().enumerate() {
            let class_idx = if label >= 0.5 { 1 } else { 0 };
            onehot[[i, class_idx]] = 1.0;
        }
        onehot
    }
}
