//! Controller-specific error types.
//!
//! Every hard error carries the originating message unmodified behind a short
//! classification prefix, so "backend rejected the config", "could not observe
//! readiness" and "could not parse the result" stay distinguishable.

use kind_model::ReconciledState;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reconciling a kind cluster.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Backend create failed; nothing was recorded
    #[error("creation failed: {0}")]
    CreationFailed(String),

    /// Backend delete failed
    #[error("deletion failed: {0}")]
    DeletionFailed(String),

    /// Backend inventory could not be listed
    #[error("failed to list clusters: {0}")]
    ListFailed(String),

    /// Backend could not produce the cluster kubeconfig
    #[error("failed to get kubeconfig: {0}")]
    KubeconfigFailed(String),

    /// Kubeconfig is not a structured document
    #[error("failed to parse credentials: {0}")]
    CredentialParse(String),

    /// Cluster was created but its nodes never became ready
    #[error("waiting for nodes failed: {source}")]
    WaitForNodes {
        /// Cluster that was left in place
        name: String,
        /// State derived from the cluster before the wait started
        state: Box<ReconciledState>,
        #[source]
        source: ReadinessError,
    },

    /// Home directory could not be resolved
    #[error("failed to get home directory")]
    HomeDirectory,

    /// Cluster is not known to the backend
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tracked state could not be read or written
    #[error("state error: {0}")]
    State(String),
}

/// Outcomes of the node readiness gate other than success.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// Nodes did not all report Ready in time
    #[error("timed out waiting for nodes to be ready after {0:?}")]
    TimedOut(Duration),

    /// Caller cancelled the wait
    #[error("cancelled while waiting for nodes to be ready")]
    Cancelled,

    /// Kubeconfig could not be turned into a cluster client
    #[error("failed to build cluster client: {0}")]
    Client(String),

    /// A single poll failed; retried at the next tick
    #[error("failed to list nodes: {0}")]
    Poll(String),
}
