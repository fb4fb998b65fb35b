//! kind backend client
//!
//! A Rust client for the kind (Kubernetes in Docker) cluster lifecycle.
//! Provides the typed `kind.x-k8s.io/v1alpha4` cluster configuration and a
//! backend that drives the `kind` binary.
//!
//! # Example
//!
//! ```no_run
//! use kind_client::{Cluster, CreateOptions, KindBackend, KindCli, Node, NodeRole};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = KindCli::new("kind");
//!
//! let mut config = Cluster::new("dev");
//! config.nodes = vec![Node::with_role(NodeRole::ControlPlane), Node::with_role(NodeRole::Worker)];
//!
//! backend
//!     .create("dev", &config, &CreateOptions { wait_for_ready: Duration::from_secs(300) })
//!     .await?;
//! let kubeconfig = backend.kubeconfig("dev").await?;
//! # let _ = kubeconfig;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
#[path = "trait.rs"]
pub mod kind_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KindCli;
pub use config::*;
pub use error::KindError;
pub use kind_trait::{CreateOptions, KindBackend};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockCall, MockKindBackend};
