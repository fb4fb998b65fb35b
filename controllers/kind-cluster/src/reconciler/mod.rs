//! Reconciliation logic for kind clusters.
//!
//! The reconciler maps the create/read/update/delete lifecycle of a
//! declarative cluster model onto the kind backend. It holds no state of its
//! own between calls: the backend handle and node status connector are passed
//! in at construction and every computed field is re-derived from the live
//! kubeconfig.

mod credentials;

use credentials::parse_credentials;

use crate::error::{ControllerError, ReadinessError};
use crate::lock::recover_stale_lock;
use crate::readiness::{NodeStatusConnector, await_ready};
use crate::synthesizer::synthesize;
use kind_client::{CreateOptions, KindBackend};
use kind_model::{ClusterModel, ReconciledState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Reconciles kind cluster resources.
pub struct Reconciler {
    backend: Arc<dyn KindBackend>,
    connector: Arc<dyn NodeStatusConnector>,
    kube_dir: Option<PathBuf>,
}

impl Reconciler {
    /// Creates a new reconciler using `~/.kube` for lock recovery and
    /// kubeconfig paths.
    pub fn new(backend: Arc<dyn KindBackend>, connector: Arc<dyn NodeStatusConnector>) -> Self {
        Self {
            backend,
            connector,
            kube_dir: dirs::home_dir().map(|home| home.join(".kube")),
        }
    }

    /// Use `kube_dir` instead of `~/.kube`
    #[must_use]
    pub fn with_kube_dir(mut self, kube_dir: impl Into<PathBuf>) -> Self {
        self.kube_dir = Some(kube_dir.into());
        self
    }

    /// Creates the cluster described by `model`.
    ///
    /// This method:
    /// 1. Removes a stale kubeconfig lock
    /// 2. Synthesizes the kind configuration and creates the cluster
    /// 3. Derives the computed state from the new kubeconfig
    /// 4. Optionally waits for every node to report Ready
    ///
    /// A failed node wait leaves the cluster in place and returns
    /// [`ControllerError::WaitForNodes`].
    pub async fn create(
        &self,
        model: &ClusterModel,
        cancel: &CancellationToken,
    ) -> Result<ReconciledState, ControllerError> {
        let name = &model.name;
        info!("Creating kind cluster {}", name);

        self.recover_lock();

        let config = synthesize(model);
        let options = CreateOptions {
            wait_for_ready: Duration::from_secs(model.wait_for_ready),
        };

        if let Err(e) = self.backend.create(name, &config, &options).await {
            error!("Failed to create kind cluster {}: {}", name, e);
            return Err(ControllerError::CreationFailed(e.to_string()));
        }

        let state = self.populate(name).await?;

        if model.wait_for_nodes_ready {
            info!("Waiting up to {:?} for nodes of {} to be ready", options.wait_for_ready, name);
            self.wait_for_nodes(&state.kubeconfig, options.wait_for_ready, cancel)
                .await
                .map_err(|source| {
                    error!("Nodes of kind cluster {} did not become ready: {}", name, source);
                    ControllerError::WaitForNodes {
                        name: name.clone(),
                        state: Box::new(state.clone()),
                        source,
                    }
                })?;
        }

        info!("Created kind cluster {} at {}", name, state.endpoint);
        Ok(state)
    }

    /// Reads the live state of the named cluster.
    ///
    /// Returns `Ok(None)` when the backend no longer has the cluster.
    pub async fn read(&self, name: &str) -> Result<Option<ReconciledState>, ControllerError> {
        info!("Reconciling kind cluster {}", name);

        let clusters = self.list().await?;
        if !clusters.iter().any(|cluster| cluster == name) {
            info!("Kind cluster {} no longer exists", name);
            return Ok(None);
        }

        self.populate(name).await.map(Some)
    }

    /// Re-derives the computed state without touching the cluster.
    ///
    /// Only the wait knobs can change without a replace, and they have no
    /// effect on a running cluster.
    pub async fn update(&self, model: &ClusterModel) -> Result<ReconciledState, ControllerError> {
        info!("Updating kind cluster {}", model.name);
        self.populate(&model.name).await
    }

    /// Deletes the named cluster. Deleting a missing cluster succeeds.
    pub async fn delete(&self, name: &str) -> Result<(), ControllerError> {
        info!("Deleting kind cluster {}", name);

        self.recover_lock();

        self.backend.delete(name).await.map_err(|e| {
            error!("Failed to delete kind cluster {}: {}", name, e);
            ControllerError::DeletionFailed(e.to_string())
        })?;

        info!("Deleted kind cluster {}", name);
        Ok(())
    }

    /// Adopts an existing cluster by name.
    pub async fn import(&self, name: &str) -> Result<ReconciledState, ControllerError> {
        info!("Importing kind cluster {}", name);
        self.read(name)
            .await?
            .ok_or_else(|| ControllerError::ClusterNotFound(name.to_string()))
    }

    /// Names of every cluster the backend knows, sorted.
    pub async fn list(&self) -> Result<Vec<String>, ControllerError> {
        let mut clusters = self.backend.list().await.map_err(|e| {
            error!("Failed to list kind clusters: {}", e);
            ControllerError::ListFailed(e.to_string())
        })?;
        clusters.sort();
        Ok(clusters)
    }

    /// Path kind exports the cluster's kubeconfig to
    pub fn kubeconfig_path(&self, name: &str) -> Result<PathBuf, ControllerError> {
        let kube_dir = self.kube_dir.as_ref().ok_or(ControllerError::HomeDirectory)?;
        Ok(kube_dir.join("kind").join(format!("kind-{}", name)))
    }

    async fn populate(&self, name: &str) -> Result<ReconciledState, ControllerError> {
        let kubeconfig = self.backend.kubeconfig(name).await.map_err(|e| {
            error!("Failed to get kubeconfig for kind cluster {}: {}", name, e);
            ControllerError::KubeconfigFailed(e.to_string())
        })?;
        let kubeconfig_path = self.kubeconfig_path(name)?;
        let credentials = parse_credentials(&kubeconfig)?;

        Ok(ReconciledState {
            id: name.to_string(),
            kubeconfig,
            kubeconfig_path: kubeconfig_path.display().to_string(),
            endpoint: credentials.endpoint,
            cluster_ca_certificate: credentials.cluster_ca_certificate,
            client_certificate: credentials.client_certificate,
            client_key: credentials.client_key,
        })
    }

    async fn wait_for_nodes(
        &self,
        kubeconfig: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ReadinessError> {
        let source = self.connector.connect(kubeconfig).await?;
        await_ready(source.as_ref(), timeout, cancel).await
    }

    fn recover_lock(&self) {
        if let Some(kube_dir) = &self.kube_dir {
            recover_stale_lock(kube_dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LOCK_FILE_NAME;
    use crate::test_utils::{ScriptedConnector, ScriptedSource, model_with_nodes, nodes};
    use kind_client::{MockCall, MockKindBackend, NodeRole};
    use kind_model::NodeModel;

    struct Harness {
        backend: MockKindBackend,
        connector: ScriptedConnector,
        reconciler: Reconciler,
        kube_dir: tempfile::TempDir,
    }

    fn harness(connector: ScriptedConnector) -> Harness {
        let backend = MockKindBackend::new();
        let kube_dir = tempfile::tempdir().unwrap();
        let reconciler = Reconciler::new(Arc::new(backend.clone()), Arc::new(connector.clone()))
            .with_kube_dir(kube_dir.path());
        Harness {
            backend,
            connector,
            reconciler,
            kube_dir,
        }
    }

    fn ready_harness() -> Harness {
        harness(ScriptedConnector::new(ScriptedSource::new(vec![Ok(nodes(&[true, true]))])))
    }

    fn no_wait(name: &str) -> ClusterModel {
        let mut model = ClusterModel::named(name);
        model.wait_for_nodes_ready = false;
        model
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_populates_state() {
        let h = ready_harness();
        let model = ClusterModel::named("dev");

        let state = h.reconciler.create(&model, &CancellationToken::new()).await.unwrap();

        assert_eq!(state.id, "dev");
        assert_eq!(state.endpoint, "https://127.0.0.1:40001");
        assert_eq!(state.cluster_ca_certificate, "Y2EtZGF0YQ1");
        assert_eq!(state.client_certificate, "Y2VydC1kYXRh1");
        assert_eq!(state.client_key, "a2V5LWRhdGE1");
        assert_eq!(state.kubeconfig, MockKindBackend::sample_kubeconfig("dev", 1));
        assert!(state.kubeconfig_path.ends_with("kind-dev"));

        let config = h.backend.created_config("dev").unwrap();
        let roles: Vec<_> = config.nodes.iter().map(|n| n.role).collect();
        assert_eq!(roles, vec![Some(NodeRole::ControlPlane), Some(NodeRole::Worker)]);
        assert_eq!(
            h.backend.created_options("dev").unwrap().wait_for_ready,
            Duration::from_secs(300)
        );
        assert_eq!(h.connector.kubeconfigs(), vec![state.kubeconfig.clone()]);
    }

    #[tokio::test]
    async fn test_create_failure_carries_backend_message() {
        let h = ready_harness();
        h.backend.fail_create("image not found");

        let result = h.reconciler.create(&ClusterModel::named("dev"), &CancellationToken::new()).await;

        match result {
            Err(ControllerError::CreationFailed(message)) => assert_eq!(message, "image not found"),
            other => panic!("expected CreationFailed, got {:?}", other),
        }
        assert_eq!(h.backend.calls(), vec![MockCall::Create("dev".to_string())]);
        assert!(h.connector.kubeconfigs().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_node_wait_skips_gate() {
        let h = ready_harness();

        h.reconciler.create(&no_wait("dev"), &CancellationToken::new()).await.unwrap();

        assert!(h.connector.kubeconfigs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_timeout_leaves_cluster_in_place() {
        let h = harness(ScriptedConnector::new(ScriptedSource::new(vec![Ok(nodes(&[true, false]))])));
        let mut model = model_with_nodes(
            "dev",
            vec![NodeModel::with_role("control-plane"), NodeModel::with_role("worker")],
        );
        model.wait_for_ready = 10;

        let result = h.reconciler.create(&model, &CancellationToken::new()).await;

        match result {
            Err(ControllerError::WaitForNodes { name, state, source }) => {
                assert_eq!(name, "dev");
                assert_eq!(state.id, "dev");
                assert_eq!(state.endpoint, "https://127.0.0.1:40001");
                assert!(matches!(source, ReadinessError::TimedOut(d) if d == Duration::from_secs(10)));
            }
            other => panic!("expected WaitForNodes, got {:?}", other),
        }
        assert!(h.backend.contains("dev"));
        assert!(!h.backend.calls().contains(&MockCall::Delete("dev".to_string())));
    }

    #[tokio::test]
    async fn test_gate_client_failure_is_wait_error() {
        let h = harness(ScriptedConnector::failing("no route to host"));

        let result = h.reconciler.create(&ClusterModel::named("dev"), &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(ControllerError::WaitForNodes {
                source: ReadinessError::Client(_),
                ..
            })
        ));
        assert!(h.backend.contains("dev"));
    }

    #[tokio::test]
    async fn test_cancelled_gate_is_wait_error() {
        let h = ready_harness();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h.reconciler.create(&ClusterModel::named("dev"), &cancel).await;

        assert!(matches!(
            result,
            Err(ControllerError::WaitForNodes {
                source: ReadinessError::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_read_is_idempotent() {
        let h = ready_harness();
        h.reconciler.create(&no_wait("dev"), &CancellationToken::new()).await.unwrap();

        let first = h.reconciler.read("dev").await.unwrap();
        let second = h.reconciler.read("dev").await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_read_missing_cluster_is_gone() {
        let h = ready_harness();

        assert_eq!(h.reconciler.read("dev").await.unwrap(), None);
        assert_eq!(h.backend.calls(), vec![MockCall::List]);
    }

    #[tokio::test]
    async fn test_read_follows_live_kubeconfig() {
        let h = ready_harness();
        h.backend.add_cluster("dev", MockKindBackend::sample_kubeconfig("dev", 1));
        let before = h.reconciler.read("dev").await.unwrap().unwrap();

        h.backend.set_kubeconfig("dev", MockKindBackend::sample_kubeconfig("dev", 7));
        let after = h.reconciler.read("dev").await.unwrap().unwrap();

        assert_eq!(before.id, after.id);
        assert_ne!(before.endpoint, after.endpoint);
        assert_eq!(after.endpoint, "https://127.0.0.1:40007");
    }

    #[tokio::test]
    async fn test_identity_is_stable_across_recreation() {
        let h = ready_harness();
        let model = no_wait("dev");

        let first = h.reconciler.create(&model, &CancellationToken::new()).await.unwrap();
        h.reconciler.delete("dev").await.unwrap();
        let second = h.reconciler.create(&model, &CancellationToken::new()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.client_key, second.client_key);
    }

    #[tokio::test]
    async fn test_list_failure_is_classified() {
        let h = ready_harness();
        h.backend.fail_list("cannot connect to the Docker daemon");

        let result = h.reconciler.read("dev").await;

        match result {
            Err(ControllerError::ListFailed(message)) => {
                assert_eq!(message, "cannot connect to the Docker daemon")
            }
            other => panic!("expected ListFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_kubeconfig_failure_is_classified() {
        let h = ready_harness();
        h.backend.add_cluster("dev", "");
        h.backend.fail_kubeconfig("container not running");

        let result = h.reconciler.read("dev").await;

        assert!(matches!(result, Err(ControllerError::KubeconfigFailed(m)) if m == "container not running"));
    }

    #[tokio::test]
    async fn test_unparseable_kubeconfig_is_credential_error() {
        let h = ready_harness();
        h.backend.add_cluster("dev", "- not\n- a mapping\n");

        let result = h.reconciler.update(&no_wait("dev")).await;

        assert!(matches!(result, Err(ControllerError::CredentialParse(_))));
    }

    #[tokio::test]
    async fn test_update_does_not_mutate_backend() {
        let h = ready_harness();
        h.backend.add_cluster("dev", MockKindBackend::sample_kubeconfig("dev", 1));

        let state = h.reconciler.update(&no_wait("dev")).await.unwrap();

        assert_eq!(state.id, "dev");
        assert_eq!(h.backend.calls(), vec![MockCall::Kubeconfig("dev".to_string())]);
    }

    #[tokio::test]
    async fn test_delete_failure_is_fatal() {
        let h = ready_harness();
        h.backend.add_cluster("dev", MockKindBackend::sample_kubeconfig("dev", 1));
        h.backend.fail_delete("permission denied");

        let result = h.reconciler.delete("dev").await;

        match result {
            Err(ControllerError::DeletionFailed(message)) => assert_eq!(message, "permission denied"),
            other => panic!("expected DeletionFailed, got {:?}", other),
        }
        assert_eq!(h.backend.calls(), vec![MockCall::Delete("dev".to_string())]);
    }

    #[tokio::test]
    async fn test_delete_removes_stale_lock() {
        let h = ready_harness();
        let lock = h.kube_dir.path().join(LOCK_FILE_NAME);
        let file = std::fs::File::create(&lock).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(120))
            .unwrap();

        h.reconciler.delete("dev").await.unwrap();

        assert!(!lock.exists());
    }

    #[tokio::test]
    async fn test_import_existing_and_missing() {
        let h = ready_harness();
        h.backend.add_cluster("legacy", MockKindBackend::sample_kubeconfig("legacy", 3));

        let state = h.reconciler.import("legacy").await.unwrap();
        assert_eq!(state.id, "legacy");
        assert_eq!(state.endpoint, "https://127.0.0.1:40003");

        let result = h.reconciler.import("ghost").await;
        assert!(matches!(result, Err(ControllerError::ClusterNotFound(n)) if n == "ghost"));
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let h = ready_harness();
        h.backend.add_cluster("zeta", "");
        h.backend.add_cluster("alpha", "");

        assert_eq!(h.reconciler.list().await.unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_kubeconfig_path_layout() {
        let reconciler = Reconciler::new(
            Arc::new(MockKindBackend::new()),
            Arc::new(ScriptedConnector::failing("unused")),
        )
        .with_kube_dir("/home/dev/.kube");

        assert_eq!(
            reconciler.kubeconfig_path("dev").unwrap(),
            PathBuf::from("/home/dev/.kube/kind/kind-dev")
        );
    }
}
