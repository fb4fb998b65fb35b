//! Test utilities for unit testing the reconciler
//!
//! Model builders plus scripted node status sources, so the readiness gate
//! can be driven without a running cluster.

use crate::error::ReadinessError;
use crate::readiness::{NodeReadiness, NodeStatusConnector, NodeStatusSource};
use async_trait::async_trait;
use kind_model::{ClusterModel, NodeModel};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Helper to create a cluster model with the given node blocks
pub fn model_with_nodes(name: &str, nodes: Vec<NodeModel>) -> ClusterModel {
    ClusterModel {
        nodes,
        ..ClusterModel::named(name)
    }
}

/// Helper to create a node block carrying a single label
pub fn labeled_node(role: &str, key: &str, value: &str) -> NodeModel {
    NodeModel {
        labels: Some(BTreeMap::from([(key.to_string(), value.to_string())])),
        ..NodeModel::with_role(role)
    }
}

/// Helper to create a node list with the given readiness, named `node-<i>`
pub fn nodes(ready: &[bool]) -> Vec<NodeReadiness> {
    ready
        .iter()
        .enumerate()
        .map(|(i, ready)| NodeReadiness {
            name: format!("node-{}", i),
            ready: *ready,
        })
        .collect()
}

/// Node status source replaying a fixed script of poll results.
///
/// Each poll consumes one entry; the last entry repeats forever. `Err`
/// entries become [`ReadinessError::Poll`].
#[derive(Clone)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<Vec<NodeReadiness>, String>>>>,
    polls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<NodeReadiness>, String>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one poll result");
        Self {
            script: Arc::new(Mutex::new(script.into())),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of polls served so far
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeStatusSource for ScriptedSource {
    async fn list_nodes(&self) -> Result<Vec<NodeReadiness>, ReadinessError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        };
        next.map_err(ReadinessError::Poll)
    }
}

/// Connector handing out a shared [`ScriptedSource`], or failing to connect.
#[derive(Clone)]
pub struct ScriptedConnector {
    source: Result<ScriptedSource, String>,
    kubeconfigs: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    pub fn new(source: ScriptedSource) -> Self {
        Self {
            source: Ok(source),
            kubeconfigs: Arc::default(),
        }
    }

    /// Connector whose every connect fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            source: Err(message.to_string()),
            kubeconfigs: Arc::default(),
        }
    }

    /// Kubeconfigs passed to `connect`, in order
    pub fn kubeconfigs(&self) -> Vec<String> {
        self.kubeconfigs.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeStatusConnector for ScriptedConnector {
    async fn connect(&self, kubeconfig: &str) -> Result<Box<dyn NodeStatusSource>, ReadinessError> {
        self.kubeconfigs.lock().unwrap().push(kubeconfig.to_string());
        match &self.source {
            Ok(source) => Ok(Box::new(source.clone())),
            Err(message) => Err(ReadinessError::Client(message.clone())),
        }
    }
}
