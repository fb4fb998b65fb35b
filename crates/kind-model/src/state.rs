//! ReconciledState
//!
//! Computed output of a reconciliation pass. Never cached beyond one pass: it
//! is rebuilt from the backend's live kubeconfig every time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Computed fields of a reconciled cluster.
///
/// Every credential field is an empty string when the kubeconfig does not
/// carry it (e.g. token-based auth), never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciledState {
    /// Cluster identifier (same as name)
    pub id: String,

    /// Raw kubeconfig for connecting to the cluster
    pub kubeconfig: String,

    /// Path the backend exports the kubeconfig to
    pub kubeconfig_path: String,

    /// API server endpoint
    pub endpoint: String,

    /// Base64 encoded cluster CA certificate
    pub cluster_ca_certificate: String,

    /// Base64 encoded client certificate
    pub client_certificate: String,

    /// Base64 encoded client key
    pub client_key: String,
}
