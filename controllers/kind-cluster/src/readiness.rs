//! Node readiness gate.
//!
//! After kind reports the control plane up, workers may still be joining.
//! The gate polls the cluster's node list on a fixed interval until every
//! registered node reports `Ready`, the timeout elapses, or the caller
//! cancels.

use crate::error::ReadinessError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Interval between node polls. The first poll happens one interval in.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Readiness of a single node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReadiness {
    pub name: String,
    pub ready: bool,
}

impl NodeReadiness {
    /// Readiness derived from the node's `Ready` condition
    pub fn from_node(node: &Node) -> Self {
        let ready = node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            })
            .unwrap_or(false);

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            ready,
        }
    }
}

/// Source of node readiness for one cluster.
#[async_trait]
pub trait NodeStatusSource: Send + Sync {
    /// Current readiness of every registered node.
    ///
    /// Errors are transient from the gate's point of view.
    async fn list_nodes(&self) -> Result<Vec<NodeReadiness>, ReadinessError>;
}

/// Turns a kubeconfig into a node status source.
#[async_trait]
pub trait NodeStatusConnector: Send + Sync {
    async fn connect(&self, kubeconfig: &str) -> Result<Box<dyn NodeStatusSource>, ReadinessError>;
}

/// Node status read from the Kubernetes API.
pub struct KubeNodeSource {
    nodes: Api<Node>,
}

impl KubeNodeSource {
    /// Build a client from an in-memory kubeconfig
    pub async fn from_kubeconfig(kubeconfig: &str) -> Result<Self, ReadinessError> {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(kubeconfig)
            .map_err(|e| ReadinessError::Client(format!("invalid kubeconfig YAML: {}", e)))?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| ReadinessError::Client(format!("failed to build config: {}", e)))?;

        let client = Client::try_from(config)
            .map_err(|e| ReadinessError::Client(format!("failed to create client: {}", e)))?;

        Ok(Self {
            nodes: Api::all(client),
        })
    }
}

#[async_trait]
impl NodeStatusSource for KubeNodeSource {
    async fn list_nodes(&self) -> Result<Vec<NodeReadiness>, ReadinessError> {
        let nodes = self
            .nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| ReadinessError::Poll(e.to_string()))?;

        Ok(nodes.items.iter().map(NodeReadiness::from_node).collect())
    }
}

/// Connector producing [`KubeNodeSource`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeConnector;

#[async_trait]
impl NodeStatusConnector for KubeConnector {
    async fn connect(&self, kubeconfig: &str) -> Result<Box<dyn NodeStatusSource>, ReadinessError> {
        let source = KubeNodeSource::from_kubeconfig(kubeconfig).await?;
        Ok(Box::new(source))
    }
}

/// Poll `source` until at least one node is registered and all are ready.
///
/// Cancellation wins over the timeout, and the timeout wins over a poll that
/// becomes due at the same moment. Zero nodes and failed polls keep waiting.
pub async fn await_ready(
    source: &dyn NodeStatusSource,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), ReadinessError> {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
            _ = &mut deadline => return Err(ReadinessError::TimedOut(timeout)),
            _ = ticker.tick() => {}
        }

        // A hung API server must not outlive the deadline
        let poll = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
            _ = &mut deadline => return Err(ReadinessError::TimedOut(timeout)),
            result = source.list_nodes() => result,
        };

        match poll {
            Ok(nodes) if nodes.is_empty() => debug!("No nodes registered yet"),
            Ok(nodes) => {
                let pending: Vec<&str> = nodes
                    .iter()
                    .filter(|n| !n.ready)
                    .map(|n| n.name.as_str())
                    .collect();
                if pending.is_empty() {
                    info!("All {} nodes are ready", nodes.len());
                    return Ok(());
                }
                debug!("Waiting for nodes to be ready: {}", pending.join(", "));
            }
            Err(e) => debug!("Node poll failed, retrying: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedSource, nodes};
    use k8s_openapi::api::core::v1::{NodeCondition, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_poll() {
        let source = ScriptedSource::new(vec![Ok(nodes(&[true, true, true]))]);
        let start = Instant::now();

        let result = await_ready(&source, Duration::from_secs(300), &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(source.polls(), 1);
        assert!(start.elapsed() >= POLL_INTERVAL);
        assert!(start.elapsed() < POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_every_node_is_ready() {
        let source = ScriptedSource::new(vec![
            Ok(nodes(&[true, false])),
            Ok(nodes(&[true, false, false])),
            Ok(nodes(&[true, true, true])),
        ]);

        let result = await_ready(&source, Duration::from_secs(300), &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_nodes_is_not_ready() {
        let source = ScriptedSource::new(vec![Ok(Vec::new()), Ok(Vec::new()), Ok(nodes(&[true]))]);

        let result = await_ready(&source, Duration::from_secs(300), &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_are_retried() {
        let source = ScriptedSource::new(vec![
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
            Ok(nodes(&[true, true])),
        ]);

        let result = await_ready(&source, Duration::from_secs(300), &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_ready() {
        let source = ScriptedSource::new(vec![Ok(nodes(&[true, false]))]);

        let result = await_ready(&source, POLL_INTERVAL, &CancellationToken::new()).await;

        match result {
            Err(ReadinessError::TimedOut(after)) => assert_eq!(after, POLL_INTERVAL),
            other => panic!("expected TimedOut, got {:?}", other),
        }
        // Timeout and first tick coincide; the timeout wins
        assert_eq!(source.polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_several_polls() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);
        let start = Instant::now();

        let result = await_ready(&source, Duration::from_secs(12), &CancellationToken::new()).await;

        assert!(matches!(result, Err(ReadinessError::TimedOut(_))));
        assert_eq!(source.polls(), 2);
        assert!(start.elapsed() >= Duration::from_secs(12));
        assert!(start.elapsed() < Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_the_wait() {
        let source = ScriptedSource::new(vec![Ok(nodes(&[false]))]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });
        let start = Instant::now();

        let result = await_ready(&source, Duration::from_secs(300), &cancel).await;

        assert!(matches!(result, Err(ReadinessError::Cancelled)));
        assert!(start.elapsed() < POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_over_timeout() {
        let source = ScriptedSource::new(vec![Ok(nodes(&[false]))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = await_ready(&source, Duration::ZERO, &cancel).await;

        assert!(matches!(result, Err(ReadinessError::Cancelled)));
        assert_eq!(source.polls(), 0);
    }

    fn node(name: &str, conditions: Option<Vec<(&str, &str)>>) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: conditions.map(|conditions| NodeStatus {
                conditions: Some(
                    conditions
                        .into_iter()
                        .map(|(type_, status)| NodeCondition {
                            type_: type_.to_string(),
                            status: status.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_readiness_follows_ready_condition() {
        let ready = node("dev-control-plane", Some(vec![("MemoryPressure", "False"), ("Ready", "True")]));
        let not_ready = node("dev-worker", Some(vec![("Ready", "False")]));
        let unknown = node("dev-worker2", Some(vec![("Ready", "Unknown")]));
        let no_status = node("dev-worker3", None);

        assert_eq!(
            NodeReadiness::from_node(&ready),
            NodeReadiness {
                name: "dev-control-plane".to_string(),
                ready: true
            }
        );
        assert!(!NodeReadiness::from_node(&not_ready).ready);
        assert!(!NodeReadiness::from_node(&unknown).ready);
        assert!(!NodeReadiness::from_node(&no_status).ready);
    }

    #[tokio::test]
    async fn test_invalid_kubeconfig_is_client_error() {
        let result = KubeNodeSource::from_kubeconfig("clusters: [unterminated").await;
        assert!(matches!(result, Err(ReadinessError::Client(_))));
    }
}
