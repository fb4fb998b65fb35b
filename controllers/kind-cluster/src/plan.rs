//! Change planning for tracked clusters.
//!
//! kind cannot mutate a running cluster, so every configuration field is
//! immutable: any difference other than the wait knobs means destroy and
//! create again.

use kind_model::ClusterModel;
use std::fmt;

/// What an apply has to do to converge on the desired model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Nothing tracked, or the backend no longer has the cluster
    Create,
    /// Tracked cluster differs in a configuration field
    Replace,
    /// Configuration unchanged; re-derive computed state only
    Refresh,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::Create => f.write_str("create"),
            PlanAction::Replace => f.write_str("replace"),
            PlanAction::Refresh => f.write_str("refresh"),
        }
    }
}

/// Whether moving from `prior` to `planned` requires a new cluster.
///
/// `wait_for_ready` and `wait_for_nodes_ready` only shape how creation is
/// awaited and are ignored.
pub fn requires_replace(prior: &ClusterModel, planned: &ClusterModel) -> bool {
    // Destructured so a new field cannot be left out of the comparison
    let ClusterModel {
        name,
        node_image,
        wait_for_ready: _,
        wait_for_nodes_ready: _,
        networking,
        feature_gates,
        runtime_config,
        kubeadm_config_patches,
        kubeadm_config_patches_json6902,
        containerd_config_patches,
        containerd_config_patches_json6902,
        nodes,
    } = prior;

    *name != planned.name
        || *node_image != planned.node_image
        || *networking != planned.networking
        || *feature_gates != planned.feature_gates
        || *runtime_config != planned.runtime_config
        || *kubeadm_config_patches != planned.kubeadm_config_patches
        || *kubeadm_config_patches_json6902 != planned.kubeadm_config_patches_json6902
        || *containerd_config_patches != planned.containerd_config_patches
        || *containerd_config_patches_json6902 != planned.containerd_config_patches_json6902
        || *nodes != planned.nodes
}

/// Decide the action for `planned` given what is tracked and whether the
/// backend still reports the tracked cluster.
pub fn plan(prior: Option<&ClusterModel>, planned: &ClusterModel, exists: bool) -> PlanAction {
    match prior {
        Some(prior) if exists => {
            if requires_replace(prior, planned) {
                PlanAction::Replace
            } else {
                PlanAction::Refresh
            }
        }
        _ => PlanAction::Create,
    }
}
