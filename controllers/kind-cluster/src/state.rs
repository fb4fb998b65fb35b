//! Tracked cluster state stored as JSON on disk.
//!
//! Holds the model a cluster was last applied from together with its
//! computed state, so the next apply can plan against it. Writes go to a
//! sibling temp file first and are renamed into place.

use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use kind_model::{ClusterModel, ReconciledState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default state file name, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "kind-cluster.state.json";

/// One tracked cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedState {
    /// Model the cluster was last applied from
    pub model: ClusterModel,
    /// Computed state from the last reconciliation
    pub reconciled: ReconciledState,
    /// When the state was last reconciled
    pub last_reconciled: DateTime<Utc>,
}

impl TrackedState {
    /// State reconciled now
    pub fn new(model: ClusterModel, reconciled: ReconciledState) -> Self {
        Self {
            model,
            reconciled,
            last_reconciled: Utc::now(),
        }
    }
}

/// JSON file holding at most one tracked cluster.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracked state, `None` if nothing is tracked.
    pub fn load(&self) -> Result<Option<TrackedState>, ControllerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            ControllerError::State(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&data).map(Some).map_err(|e| {
            ControllerError::State(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Replace the tracked state.
    pub fn save(&self, state: &TrackedState) -> Result<(), ControllerError> {
        let data = serde_json::to_string_pretty(state)
            .map_err(|e| ControllerError::State(format!("failed to serialize state: {}", e)))?;

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        std::fs::write(&temp, data).map_err(|e| {
            ControllerError::State(format!("failed to write {}: {}", temp.display(), e))
        })?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            ControllerError::State(format!(
                "failed to move {} to {}: {}",
                temp.display(),
                self.path.display(),
                e
            ))
        })
    }

    /// Stop tracking. Clearing an empty store succeeds.
    pub fn clear(&self) -> Result<(), ControllerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ControllerError::State(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
