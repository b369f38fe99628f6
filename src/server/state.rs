//! Application state management

use tokio::sync::{Mutex, RwLock};

use crate::export::ModelStore;
use crate::workflow::TrainOutcome;

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub store: ModelStore,
    /// Outcome of the most recent successful train action
    pub last_training: RwLock<Option<TrainOutcome>>,
    /// Held for the whole of a train action so runs never race on the slot
    pub train_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = ModelStore::new(&config.model_path);
        Self {
            config,
            store,
            last_training: RwLock::new(None),
            train_lock: Mutex::new(()),
        }
    }
}
