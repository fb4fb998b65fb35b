//! Translation of a declarative cluster model into a kind configuration.
//!
//! Synthesis is total: every model produces a configuration. Unset and empty
//! values are left out so kind applies its own defaults, and enum strings the
//! backend does not know are dropped with a warning instead of failing.

use kind_client::{
    Cluster, ClusterIpFamily, Mount, MountPropagation, Networking, Node, NodeRole, PatchJson6902,
    PortMapping, PortMappingProtocol, ProxyMode,
};
use kind_model::{
    ClusterModel, MountModel, NetworkingModel, NodeModel, PatchJson6902Model, PortMappingModel,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

/// Build the kind configuration for a cluster model.
///
/// A model without node blocks yields the two-node topology of one
/// control-plane and one worker. Otherwise nodes follow the declared order.
pub fn synthesize(model: &ClusterModel) -> Cluster {
    let mut cluster = Cluster::new(&model.name);
    let cluster_image = non_empty(model.node_image.as_ref());

    cluster.nodes = if model.nodes.is_empty() {
        vec![
            default_node(NodeRole::ControlPlane, cluster_image),
            default_node(NodeRole::Worker, cluster_image),
        ]
    } else {
        model
            .nodes
            .iter()
            .map(|node| synthesize_node(node, cluster_image))
            .collect()
    };

    if let Some(networking) = &model.networking {
        cluster.networking = synthesize_networking(networking);
    }

    cluster.feature_gates = map_or_empty(model.feature_gates.as_ref());
    cluster.runtime_config = map_or_empty(model.runtime_config.as_ref());
    cluster.kubeadm_config_patches = list_or_empty(model.kubeadm_config_patches.as_ref());
    cluster.kubeadm_config_patches_json6902 = synthesize_patches(&model.kubeadm_config_patches_json6902);
    cluster.containerd_config_patches = list_or_empty(model.containerd_config_patches.as_ref());
    cluster.containerd_config_patches_json6902 =
        list_or_empty(model.containerd_config_patches_json6902.as_ref());

    cluster
}

fn default_node(role: NodeRole, image: Option<&String>) -> Node {
    Node {
        image: image.cloned(),
        ..Node::with_role(role)
    }
}

fn synthesize_node(model: &NodeModel, cluster_image: Option<&String>) -> Node {
    Node {
        role: parse_enum("role", &model.role),
        image: non_empty(model.image.as_ref()).or(cluster_image).cloned(),
        // Labels are carried whenever present, even when empty
        labels: model.labels.clone(),
        extra_mounts: model.extra_mounts.iter().map(synthesize_mount).collect(),
        extra_port_mappings: model
            .extra_port_mappings
            .iter()
            .map(synthesize_port_mapping)
            .collect(),
        kubeadm_config_patches: list_or_empty(model.kubeadm_config_patches.as_ref()),
        kubeadm_config_patches_json6902: synthesize_patches(&model.kubeadm_config_patches_json6902),
    }
}

fn synthesize_networking(model: &NetworkingModel) -> Networking {
    Networking {
        ip_family: non_empty(model.ip_family.as_ref())
            .and_then(|value| parse_enum::<ClusterIpFamily>("ip_family", value)),
        api_server_port: model.api_server_port,
        api_server_address: non_empty(model.api_server_address.as_ref()).cloned(),
        pod_subnet: non_empty(model.pod_subnet.as_ref()).cloned(),
        service_subnet: non_empty(model.service_subnet.as_ref()).cloned(),
        disable_default_cni: model.disable_default_cni.unwrap_or(false),
        kube_proxy_mode: non_empty(model.kube_proxy_mode.as_ref())
            .and_then(|value| parse_enum::<ProxyMode>("kube_proxy_mode", value)),
        dns_search: model
            .dns_search
            .as_ref()
            .filter(|domains| !domains.is_empty())
            .cloned(),
    }
}

fn synthesize_mount(model: &MountModel) -> Mount {
    Mount {
        host_path: model.host_path.clone(),
        container_path: model.container_path.clone(),
        read_only: model.read_only.unwrap_or(false),
        selinux_relabel: model.selinux_relabel.unwrap_or(false),
        propagation: non_empty(model.propagation.as_ref())
            .and_then(|value| parse_enum::<MountPropagation>("propagation", value)),
    }
}

fn synthesize_port_mapping(model: &PortMappingModel) -> PortMapping {
    PortMapping {
        container_port: model.container_port,
        host_port: model.host_port,
        listen_address: non_empty(model.listen_address.as_ref()).cloned(),
        protocol: non_empty(model.protocol.as_ref())
            .and_then(|value| parse_enum::<PortMappingProtocol>("protocol", value)),
    }
}

fn synthesize_patches(patches: &[PatchJson6902Model]) -> Vec<PatchJson6902> {
    patches
        .iter()
        .map(|patch| PatchJson6902 {
            group: patch.group.clone(),
            version: patch.version.clone(),
            kind: patch.kind.clone(),
            patch: patch.patch.clone(),
        })
        .collect()
}

/// Exact-match enum parse; an unknown value leaves the field unset.
fn parse_enum<T: FromStr>(field: &str, value: &str) -> Option<T> {
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring unrecognized {} value {:?}, leaving it unset", field, value);
            None
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|s| !s.is_empty())
}

fn list_or_empty(values: Option<&Vec<String>>) -> Vec<String> {
    values.cloned().unwrap_or_default()
}

fn map_or_empty<V: Clone>(values: Option<&BTreeMap<String, V>>) -> BTreeMap<String, V> {
    values.cloned().unwrap_or_default()
}
