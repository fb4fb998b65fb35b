//! kind Cluster Controller
//!
//! Manages kind (Kubernetes in Docker) clusters declaratively:
//! - Synthesizes kind cluster configuration from a cluster model
//! - Creates, reads, replaces and deletes clusters through the kind CLI
//! - Waits for every node to report Ready after creation
//!
//! Applied clusters are tracked in a local state file so repeated applies
//! converge instead of recreating.

mod cli;
mod controller;
mod error;
mod lock;
mod plan;
mod readiness;
mod reconciler;
mod state;
mod synthesizer;
#[cfg(test)]
mod test_utils;

use clap::Parser;
use cli::Cli;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Install crypto provider for rustls before any kube client is built
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    cli.run(cancel).await
}
