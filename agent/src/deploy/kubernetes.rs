//! Kubernetes deployer

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::deploy::{run_command, DeployOptions, Deployer};
use crate::errors::AgentError;

/// Deployer applying manifests through kubectl
pub struct KubernetesDeployer;

impl KubernetesDeployer {
    pub fn new() -> Self {
        Self
    }

    fn kubectl(namespace: Option<&str>) -> Command {
        let mut cmd = Command::new("kubectl");
        if let Some(ns) = namespace {
            if !ns.is_empty() {
                cmd.args(["--namespace", ns]);
            }
        }
        cmd
    }
}

impl Default for KubernetesDeployer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Deployer for KubernetesDeployer {
    async fn deploy(
        &self,
        _project: &str,
        files: &[PathBuf],
        options: DeployOptions,
    ) -> Result<(), AgentError> {
        let mut cmd = Self::kubectl(options.namespace.as_deref());
        cmd.arg("apply");
        for file in files {
            cmd.arg("-f").arg(file);
        }
        run_command(cmd, "kubectl apply").await
    }

    async fn pull(&self, project: &str, _files: &[PathBuf]) -> Result<(), AgentError> {
        // The kubelet pulls images at pod scheduling time.
        debug!("pull is a no-op for kubernetes stack {}", project);
        Ok(())
    }

    async fn remove(&self, _project: &str, files: &[PathBuf]) -> Result<(), AgentError> {
        let mut cmd = Self::kubectl(None);
        cmd.args(["delete", "--ignore-not-found"]);
        for file in files {
            cmd.arg("-f").arg(file);
        }
        run_command(cmd, "kubectl delete").await
    }
}
