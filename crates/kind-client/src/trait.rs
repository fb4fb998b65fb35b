//! KindBackend trait for mocking
//!
//! This trait abstracts the kind cluster lifecycle so reconciliation can be
//! unit tested without Docker. `KindCli` implements it against the real `kind`
//! binary, tests use `MockKindBackend`.

use crate::config::Cluster;
use crate::error::KindError;
use std::time::Duration;

/// Options for a single cluster creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// How long the backend waits for the control plane to become ready
    pub wait_for_ready: Duration,
}

/// Lifecycle operations of the kind backend.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait KindBackend: Send + Sync {
    /// Create the named cluster from a complete configuration.
    async fn create(&self, name: &str, config: &Cluster, options: &CreateOptions) -> Result<(), KindError>;

    /// Delete the named cluster.
    async fn delete(&self, name: &str) -> Result<(), KindError>;

    /// Names of every cluster the backend knows about.
    async fn list(&self) -> Result<Vec<String>, KindError>;

    /// External kubeconfig of the named cluster.
    async fn kubeconfig(&self, name: &str) -> Result<String, KindError>;
}
