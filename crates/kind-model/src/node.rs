//! NodeModel
//!
//! Per-node blocks of a cluster model.

use crate::cluster::PatchJson6902Model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of the cluster topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NodeModel {
    /// Node role: `control-plane` or `worker`
    pub role: String,

    /// Node image, overrides the cluster-level `node_image`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Kubernetes labels for the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Kubeadm merge patches (RFC 7386) for this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeadm_config_patches: Option<Vec<String>>,

    /// Kubeadm JSON patches (RFC 6902) for this node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches_json6902: Vec<PatchJson6902Model>,

    /// Additional mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_mounts: Vec<MountModel>,

    /// Host to container port mappings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_port_mappings: Vec<PortMappingModel>,
}

impl NodeModel {
    /// Node block with only a role set.
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            image: None,
            labels: None,
            kubeadm_config_patches: None,
            kubeadm_config_patches_json6902: Vec::new(),
            extra_mounts: Vec::new(),
            extra_port_mappings: Vec::new(),
        }
    }
}

/// Host path mounted into a node container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MountModel {
    /// Path on the host
    pub host_path: String,

    /// Path in the node container
    pub container_path: String,

    /// Mount read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,

    /// Apply SELinux relabeling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selinux_relabel: Option<bool>,

    /// Propagation: `None`, `HostToContainer` or `Bidirectional`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation: Option<String>,
}

/// Host port forwarded into a node container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PortMappingModel {
    /// Port in the node container
    pub container_port: i32,

    /// Port on the host
    pub host_port: i32,

    /// Host bind address (loopback when left to the backend default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,

    /// Protocol: `TCP`, `UDP` or `SCTP`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}
