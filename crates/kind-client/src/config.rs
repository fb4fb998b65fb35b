//! kind `v1alpha4` cluster configuration
//!
//! Typed mirror of the document accepted by `kind create cluster --config`.
//! Unset fields are omitted when rendered, and every list keeps its order:
//! kind applies patches and builds the node topology positionally.

use crate::error::KindError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `apiVersion` of the rendered document
pub const API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

/// `kind` of the rendered document
pub const CLUSTER_KIND: &str = "Cluster";

fn is_false(value: &bool) -> bool {
    !*value
}

/// Complete cluster configuration handed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub kind: String,

    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,

    #[serde(default, skip_serializing_if = "Networking::is_empty")]
    pub networking: Networking,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runtime_config: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,

    #[serde(
        rename = "kubeadmConfigPatchesJSON6902",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub kubeadm_config_patches_json6902: Vec<PatchJson6902>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containerd_config_patches: Vec<String>,

    #[serde(
        rename = "containerdConfigPatchesJSON6902",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub containerd_config_patches_json6902: Vec<String>,
}

impl Cluster {
    /// Empty configuration for the named cluster.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: CLUSTER_KIND.to_string(),
            api_version: API_VERSION.to_string(),
            name: name.into(),
            nodes: Vec::new(),
            networking: Networking::default(),
            feature_gates: BTreeMap::new(),
            runtime_config: BTreeMap::new(),
            kubeadm_config_patches: Vec::new(),
            kubeadm_config_patches_json6902: Vec::new(),
            containerd_config_patches: Vec::new(),
            containerd_config_patches_json6902: Vec::new(),
        }
    }

    /// Render the configuration as the YAML document kind reads.
    pub fn to_yaml(&self) -> Result<String, KindError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Cluster-wide networking settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<ClusterIpFamily>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_subnet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_subnet: Option<String>,

    #[serde(rename = "disableDefaultCNI", default, skip_serializing_if = "is_false")]
    pub disable_default_cni: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_mode: Option<ProxyMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
}

impl Networking {
    /// True when no networking override is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One node of the topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unset lets kind default the role (control-plane)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,

    /// Unset lets kind pick its default node image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_mounts: Vec<Mount>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_port_mappings: Vec<PortMapping>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,

    #[serde(
        rename = "kubeadmConfigPatchesJSON6902",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub kubeadm_config_patches_json6902: Vec<PatchJson6902>,
}

impl Node {
    /// Node with only its role set.
    pub fn with_role(role: NodeRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }
}

/// Host path mounted into a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    pub host_path: String,

    pub container_path: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub selinux_relabel: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation: Option<MountPropagation>,
}

/// Host port forwarded into a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: i32,

    pub host_port: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<PortMappingProtocol>,
}

/// RFC 6902 patch addressed by group/version/kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchJson6902 {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub patch: String,
}

/// Node role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    #[serde(rename = "control-plane")]
    ControlPlane,
    #[serde(rename = "worker")]
    Worker,
}

impl NodeRole {
    /// Wire value of the role
    pub fn as_str(self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "control-plane",
            NodeRole::Worker => "worker",
        }
    }
}

impl FromStr for NodeRole {
    type Err = KindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "control-plane" => Ok(NodeRole::ControlPlane),
            "worker" => Ok(NodeRole::Worker),
            other => Err(KindError::UnknownValue {
                field: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP family of the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterIpFamily {
    Ipv4,
    Ipv6,
    Dual,
}

impl FromStr for ClusterIpFamily {
    type Err = KindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ipv4" => Ok(ClusterIpFamily::Ipv4),
            "ipv6" => Ok(ClusterIpFamily::Ipv6),
            "dual" => Ok(ClusterIpFamily::Dual),
            other => Err(KindError::UnknownValue {
                field: "ip_family",
                value: other.to_string(),
            }),
        }
    }
}

/// kube-proxy mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    Iptables,
    Ipvs,
    Nftables,
    None,
}

impl FromStr for ProxyMode {
    type Err = KindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "iptables" => Ok(ProxyMode::Iptables),
            "ipvs" => Ok(ProxyMode::Ipvs),
            "nftables" => Ok(ProxyMode::Nftables),
            "none" => Ok(ProxyMode::None),
            other => Err(KindError::UnknownValue {
                field: "kube_proxy_mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Mount propagation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountPropagation {
    None,
    HostToContainer,
    Bidirectional,
}

impl FromStr for MountPropagation {
    type Err = KindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "None" => Ok(MountPropagation::None),
            "HostToContainer" => Ok(MountPropagation::HostToContainer),
            "Bidirectional" => Ok(MountPropagation::Bidirectional),
            other => Err(KindError::UnknownValue {
                field: "propagation",
                value: other.to_string(),
            }),
        }
    }
}

/// Port mapping protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortMappingProtocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "SCTP")]
    Sctp,
}

impl FromStr for PortMappingProtocol {
    type Err = KindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "TCP" => Ok(PortMappingProtocol::Tcp),
            "UDP" => Ok(PortMappingProtocol::Udp),
            "SCTP" => Ok(PortMappingProtocol::Sctp),
            other => Err(KindError::UnknownValue {
                field: "protocol",
                value: other.to_string(),
            }),
        }
    }
}
