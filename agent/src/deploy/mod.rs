//! Stack deployers
//!
//! Each deployer wraps the CLI of one orchestrator behind the [`Deployer`]
//! contract. Commands are spawned with `kill_on_drop` so that dropping an
//! in-flight operation (worker shutdown) also terminates the child process.

pub mod compose;
pub mod kubernetes;
pub mod nomad;
pub mod swarm;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::AgentError;
use crate::models::stack::EngineKind;

/// Per-deploy options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Kubernetes namespace to deploy into
    pub namespace: Option<String>,
}

/// Uniform contract over heterogeneous deployment tools.
///
/// All operations are blocking black boxes over a named project and a list
/// of manifest file paths; no streaming output is exposed.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Bring the named project to the state described by the files.
    async fn deploy(
        &self,
        project: &str,
        files: &[PathBuf],
        options: DeployOptions,
    ) -> Result<(), AgentError>;

    /// Fetch all images referenced by the manifests without deploying.
    async fn pull(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError>;

    /// Tear down the named project.
    async fn remove(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError>;
}

/// Construct the deployer for an engine kind.
///
/// `assets_path` is the directory checked first for bundled binaries.
pub fn build_deployer(
    kind: EngineKind,
    assets_path: &Path,
) -> Result<Arc<dyn Deployer>, AgentError> {
    match kind {
        EngineKind::DockerStandalone => Ok(Arc::new(compose::ComposeDeployer::new(assets_path))),
        EngineKind::DockerSwarm => Ok(Arc::new(swarm::SwarmDeployer::new(assets_path))),
        EngineKind::Kubernetes => Ok(Arc::new(kubernetes::KubernetesDeployer::new())),
        EngineKind::Nomad => Ok(Arc::new(nomad::NomadDeployer::new())),
    }
}

/// Run a prepared command to completion, mapping a non-zero exit into a
/// deploy error carrying the trailing stderr.
pub(crate) async fn run_command(mut command: Command, what: &str) -> Result<(), AgentError> {
    debug!("running {:?}", command.as_std());

    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AgentError::DeployError(format!("failed to run {}: {}", what, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AgentError::DeployError(format!(
            "{} exited with {}: {}",
            what,
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}
