//! Nomad deployer

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::deploy::{run_command, DeployOptions, Deployer};
use crate::errors::AgentError;

/// Deployer running job files through the nomad CLI
pub struct NomadDeployer;

impl NomadDeployer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NomadDeployer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Deployer for NomadDeployer {
    async fn deploy(
        &self,
        _project: &str,
        files: &[PathBuf],
        _options: DeployOptions,
    ) -> Result<(), AgentError> {
        for file in files {
            let mut cmd = Command::new("nomad");
            cmd.args(["job", "run"]).arg(file);
            run_command(cmd, "nomad job run").await?;
        }
        Ok(())
    }

    async fn pull(&self, project: &str, _files: &[PathBuf]) -> Result<(), AgentError> {
        // Nomad clients pull images during task placement.
        debug!("pull is a no-op for nomad stack {}", project);
        Ok(())
    }

    async fn remove(&self, project: &str, _files: &[PathBuf]) -> Result<(), AgentError> {
        let mut cmd = Command::new("nomad");
        cmd.args(["job", "stop", "-purge", project]);
        run_command(cmd, "nomad job stop").await
    }
}
