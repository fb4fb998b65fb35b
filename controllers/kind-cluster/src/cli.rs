//! Command line interface.

use crate::controller::Controller;
use crate::readiness::KubeConnector;
use crate::reconciler::Reconciler;
use crate::state::{DEFAULT_STATE_FILE, StateStore};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kind_client::KindCli;
use kind_model::ClusterModel;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// kind-cluster - declarative kind cluster lifecycle
#[derive(Parser, Debug)]
#[command(name = "kind-cluster")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File tracking the applied cluster
    #[arg(long, global = true, env = "KIND_CLUSTER_STATE", default_value = DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// kind executable
    #[arg(long, global = true, env = "KIND_BINARY", default_value = "kind")]
    pub kind_binary: String,

    /// Docker daemon endpoint passed to kind
    #[arg(long, global = true, env = "DOCKER_HOST")]
    pub docker_host: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, refresh or replace the cluster described by a model file
    Apply(ModelArgs),
    /// Show what apply would do
    Plan(ModelArgs),
    /// Re-read the tracked cluster from kind
    Refresh,
    /// Delete the tracked cluster
    Destroy,
    /// Start tracking an existing kind cluster
    Import {
        /// Name of the kind cluster
        name: String,
    },
    /// List kind clusters
    List,
    /// Print the kubeconfig of the tracked cluster
    Kubeconfig,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Cluster model (YAML)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut backend = KindCli::new(&self.kind_binary);
        if let Some(host) = &self.docker_host {
            backend = backend.with_docker_host(host);
        }
        let reconciler = Reconciler::new(Arc::new(backend), Arc::new(KubeConnector));
        let controller = Controller::new(reconciler, StateStore::new(&self.state));

        match self.command {
            Commands::Apply(args) => {
                let model = load_model(&args.file)?;
                let state = controller.apply(model, &cancel).await?;
                info!("Applied kind cluster {}", state.model.name);
                println!("name:            {}", state.reconciled.id);
                println!("endpoint:        {}", state.reconciled.endpoint);
                println!("kubeconfig_path: {}", state.reconciled.kubeconfig_path);
            }
            Commands::Plan(args) => {
                let model = load_model(&args.file)?;
                let action = controller.plan(&model).await?;
                println!("Plan: {} kind cluster {}", action, model.name);
            }
            Commands::Refresh => match controller.refresh().await? {
                Some(state) => println!("{} is up at {}", state.reconciled.id, state.reconciled.endpoint),
                None => println!("No kind cluster is tracked"),
            },
            Commands::Destroy => match controller.destroy().await? {
                Some(name) => println!("Destroyed kind cluster {}", name),
                None => println!("No kind cluster is tracked"),
            },
            Commands::Import { name } => {
                let state = controller.import(&name).await?;
                println!("Imported kind cluster {} ({})", state.reconciled.id, state.reconciled.endpoint);
            }
            Commands::List => {
                for name in controller.list().await? {
                    println!("{}", name);
                }
            }
            Commands::Kubeconfig => print!("{}", controller.kubeconfig()?),
        }

        Ok(())
    }
}

fn load_model(path: &Path) -> anyhow::Result<ClusterModel> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ClusterModel::from_yaml(&source).with_context(|| format!("failed to parse {}", path.display()))
}
