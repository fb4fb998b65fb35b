//! Mock kind backend for unit testing
//!
//! Keeps clusters in memory and can be told to fail any operation with a given
//! message, so reconciliation can be tested without Docker.

use crate::config::Cluster;
use crate::error::KindError;
use crate::kind_trait::{CreateOptions, KindBackend};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Create(String),
    Delete(String),
    List,
    Kubeconfig(String),
}

#[derive(Debug, Clone)]
struct MockCluster {
    config: Cluster,
    options: CreateOptions,
    kubeconfig: String,
}

#[derive(Debug, Default)]
struct MockState {
    clusters: BTreeMap<String, MockCluster>,
    calls: Vec<MockCall>,
    create_error: Option<String>,
    delete_error: Option<String>,
    list_error: Option<String>,
    kubeconfig_error: Option<String>,
    generation: u64,
}

/// Mock kind backend for testing
#[derive(Debug, Clone, Default)]
pub struct MockKindBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockKindBackend {
    /// Create a new mock backend with no clusters
    pub fn new() -> Self {
        Self::default()
    }

    /// Kubeconfig the mock hands out for a cluster instantiation.
    ///
    /// Server port and credentials depend on `generation`, so recreating a
    /// cluster yields a different bundle.
    pub fn sample_kubeconfig(name: &str, generation: u64) -> String {
        format!(
            r#"apiVersion: v1
kind: Config
clusters:
- name: kind-{name}
  cluster:
    server: https://127.0.0.1:{port}
    certificate-authority-data: Y2EtZGF0YQ{generation}
contexts:
- name: kind-{name}
  context:
    cluster: kind-{name}
    user: kind-{name}
current-context: kind-{name}
users:
- name: kind-{name}
  user:
    client-certificate-data: Y2VydC1kYXRh{generation}
    client-key-data: a2V5LWRhdGE{generation}
"#,
            name = name,
            port = 40000 + generation,
            generation = generation,
        )
    }

    /// Add an existing cluster (for test setup)
    pub fn add_cluster(&self, name: &str, kubeconfig: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.clusters.insert(
            name.to_string(),
            MockCluster {
                config: Cluster::new(name),
                options: CreateOptions {
                    wait_for_ready: std::time::Duration::ZERO,
                },
                kubeconfig: kubeconfig.into(),
            },
        );
    }

    /// Remove a cluster without recording a call (for test setup)
    pub fn remove_cluster(&self, name: &str) {
        self.state.lock().unwrap().clusters.remove(name);
    }

    /// Replace the kubeconfig returned for a cluster (for test setup)
    pub fn set_kubeconfig(&self, name: &str, kubeconfig: impl Into<String>) {
        if let Some(cluster) = self.state.lock().unwrap().clusters.get_mut(name) {
            cluster.kubeconfig = kubeconfig.into();
        }
    }

    /// Make every subsequent create fail with `message`
    pub fn fail_create(&self, message: impl Into<String>) {
        self.state.lock().unwrap().create_error = Some(message.into());
    }

    /// Make every subsequent delete fail with `message`
    pub fn fail_delete(&self, message: impl Into<String>) {
        self.state.lock().unwrap().delete_error = Some(message.into());
    }

    /// Make every subsequent list fail with `message`
    pub fn fail_list(&self, message: impl Into<String>) {
        self.state.lock().unwrap().list_error = Some(message.into());
    }

    /// Make every subsequent kubeconfig fetch fail with `message`
    pub fn fail_kubeconfig(&self, message: impl Into<String>) {
        self.state.lock().unwrap().kubeconfig_error = Some(message.into());
    }

    /// Configuration the named cluster was created from
    pub fn created_config(&self, name: &str) -> Option<Cluster> {
        self.state.lock().unwrap().clusters.get(name).map(|c| c.config.clone())
    }

    /// Options the named cluster was created with
    pub fn created_options(&self, name: &str) -> Option<CreateOptions> {
        self.state.lock().unwrap().clusters.get(name).map(|c| c.options.clone())
    }

    /// Whether the named cluster currently exists
    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().unwrap().clusters.contains_key(name)
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait::async_trait]
impl KindBackend for MockKindBackend {
    async fn create(&self, name: &str, config: &Cluster, options: &CreateOptions) -> Result<(), KindError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Create(name.to_string()));

        if let Some(message) = &state.create_error {
            return Err(KindError::Backend(message.clone()));
        }
        if state.clusters.contains_key(name) {
            return Err(KindError::Backend(format!(
                "node(s) already exist for a cluster with the name \"{}\"",
                name
            )));
        }

        state.generation += 1;
        let kubeconfig = Self::sample_kubeconfig(name, state.generation);
        state.clusters.insert(
            name.to_string(),
            MockCluster {
                config: config.clone(),
                options: options.clone(),
                kubeconfig,
            },
        );
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), KindError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Delete(name.to_string()));

        if let Some(message) = &state.delete_error {
            return Err(KindError::Backend(message.clone()));
        }
        // kind treats deleting a missing cluster as success
        state.clusters.remove(name);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, KindError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::List);

        if let Some(message) = &state.list_error {
            return Err(KindError::Backend(message.clone()));
        }
        Ok(state.clusters.keys().cloned().collect())
    }

    async fn kubeconfig(&self, name: &str) -> Result<String, KindError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Kubeconfig(name.to_string()));

        if let Some(message) = &state.kubeconfig_error {
            return Err(KindError::Backend(message.clone()));
        }
        state
            .clusters
            .get(name)
            .map(|c| c.kubeconfig.clone())
            .ok_or_else(|| {
                KindError::Backend(format!(
                    "could not locate any control plane nodes for cluster named '{}'",
                    name
                ))
            })
    }
}
