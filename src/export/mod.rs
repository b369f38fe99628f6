//! Model persistence
//!
//! Trained models live in a single JSON slot that each training run overwrites.

mod serializer;

pub use serializer::{ModelStore, DEFAULT_MODEL_PATH, MODEL_PATH_ENV};
