//! kind CLI backend
//!
//! Implements the cluster lifecycle by running the `kind` binary:
//! `create cluster`, `delete cluster`, `get clusters` and `get kubeconfig`.

use crate::config::Cluster;
use crate::error::KindError;
use crate::kind_trait::{CreateOptions, KindBackend};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Backend driving the `kind` binary.
#[derive(Debug, Clone)]
pub struct KindCli {
    binary: String,
    docker_host: Option<String>,
}

impl KindCli {
    /// Create a backend running the given `kind` binary
    ///
    /// # Arguments
    /// * `binary` - Name or path of the kind executable (e.g., "kind")
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            docker_host: None,
        }
    }

    /// Point every kind invocation at a specific Docker daemon.
    ///
    /// The endpoint is passed to each child process as `DOCKER_HOST` rather
    /// than set on this process.
    #[must_use]
    pub fn with_docker_host(mut self, docker_host: impl Into<String>) -> Self {
        self.docker_host = Some(docker_host.into());
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(host) = &self.docker_host {
            command.env("DOCKER_HOST", host);
        }
        command
    }

    fn check(&self, args: &[&str], output: Output) -> Result<String, KindError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(KindError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                message,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn run(&self, args: &[&str]) -> Result<String, KindError> {
        debug!("Running {} {}", self.binary, args.join(" "));
        let output = self.command(args).output().await?;
        self.check(args, output)
    }
}

#[async_trait::async_trait]
impl KindBackend for KindCli {
    async fn create(&self, name: &str, config: &Cluster, options: &CreateOptions) -> Result<(), KindError> {
        let rendered = config.to_yaml()?;
        let wait = format!("{}s", options.wait_for_ready.as_secs());
        let args = ["create", "cluster", "--name", name, "--config", "-", "--wait", wait.as_str()];

        debug!("Creating kind cluster {} with config:\n{}", name, rendered);

        let mut command = self.command(&args);
        // An abandoned create must not keep provisioning
        command.stdin(Stdio::piped()).kill_on_drop(true);
        let mut child = command.spawn()?;

        // Config is read from stdin
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(rendered.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        self.check(&args, output)?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), KindError> {
        self.run(&["delete", "cluster", "--name", name]).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, KindError> {
        // "No kind clusters found." goes to stderr, stdout is empty then
        let stdout = self.run(&["get", "clusters"]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    async fn kubeconfig(&self, name: &str) -> Result<String, KindError> {
        self.run(&["get", "kubeconfig", "--name", name]).await
    }
}
