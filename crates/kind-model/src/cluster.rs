//! ClusterModel
//!
//! Top-level declarative description of one kind cluster.

use crate::node::NodeModel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default control-plane wait, in seconds.
pub const DEFAULT_WAIT_FOR_READY_SECS: u64 = 300;

fn default_wait_for_ready() -> u64 {
    DEFAULT_WAIT_FOR_READY_SECS
}

fn default_wait_for_nodes_ready() -> bool {
    true
}

/// Declarative kind cluster resource.
///
/// `name` is the identity of the resource. Every other configuration field is
/// immutable once the cluster exists: a change forces the cluster to be
/// destroyed and created again. `wait_for_ready` and `wait_for_nodes_ready`
/// only shape how creation is awaited and never force replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterModel {
    /// Name of the cluster
    pub name: String,

    /// Node image applied to every node that does not set its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_image: Option<String>,

    /// Seconds to wait for the control plane (and, optionally, all nodes)
    #[serde(default = "default_wait_for_ready")]
    pub wait_for_ready: u64,

    /// Wait for every node to report Ready after creation
    #[serde(default = "default_wait_for_nodes_ready")]
    pub wait_for_nodes_ready: bool,

    /// Cluster networking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<NetworkingModel>,

    /// Kubernetes feature gates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_gates: Option<BTreeMap<String, bool>>,

    /// kube-apiserver `--runtime-config` entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_config: Option<BTreeMap<String, String>>,

    /// Kubeadm merge patches (RFC 7386) applied to all nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeadm_config_patches: Option<Vec<String>>,

    /// Kubeadm JSON patches (RFC 6902) applied to all nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches_json6902: Vec<PatchJson6902Model>,

    /// Containerd config patches (TOML) applied to all nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerd_config_patches: Option<Vec<String>>,

    /// Containerd JSON patches (RFC 6902) applied to all nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerd_config_patches_json6902: Option<Vec<String>>,

    /// Node topology, in order. Empty means one control-plane and one worker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeModel>,
}

impl ClusterModel {
    /// Model carrying only an identity and default settings.
    ///
    /// Used when adopting an existing cluster, where the configuration it was
    /// created from is unknown.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_image: None,
            wait_for_ready: DEFAULT_WAIT_FOR_READY_SECS,
            wait_for_nodes_ready: true,
            networking: None,
            feature_gates: None,
            runtime_config: None,
            kubeadm_config_patches: None,
            kubeadm_config_patches_json6902: Vec::new(),
            containerd_config_patches: None,
            containerd_config_patches_json6902: None,
            nodes: Vec::new(),
        }
    }

    /// Parse a model from its YAML document form.
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}

/// Cluster networking block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NetworkingModel {
    /// IP family: `ipv4`, `ipv6` or `dual`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<String>,

    /// Host port for the API server. 0 picks a random port, -1 lets the backend choose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_port: Option<i32>,

    /// Host address the API server binds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_address: Option<String>,

    /// Pod CIDR, e.g. `10.244.0.0/16`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_subnet: Option<String>,

    /// Service CIDR, e.g. `10.96.0.0/12`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_subnet: Option<String>,

    /// Skip installing the default CNI (kindnet)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_default_cni: Option<bool>,

    /// kube-proxy mode: `iptables`, `ipvs`, `nftables` or `none`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_mode: Option<String>,

    /// DNS search domains for nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
}

/// RFC 6902 patch addressed by group/version/kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PatchJson6902Model {
    /// API group of the target document
    pub group: String,

    /// API version of the target document
    pub version: String,

    /// Kind of the target document
    pub kind: String,

    /// JSON patch body
    pub patch: String,
}
