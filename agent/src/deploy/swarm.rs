//! Docker Swarm deployer

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::deploy::compose::ComposeBinary;
use crate::deploy::{run_command, DeployOptions, Deployer};
use crate::errors::AgentError;

/// Deployer for clustered docker (swarm mode) stacks
pub struct SwarmDeployer {
    /// Pulls go through compose; swarm itself has no pull verb
    compose: ComposeBinary,
}

impl SwarmDeployer {
    pub fn new(assets_path: &Path) -> Self {
        Self {
            compose: ComposeBinary::detect(assets_path),
        }
    }
}

#[async_trait]
impl Deployer for SwarmDeployer {
    async fn deploy(
        &self,
        project: &str,
        files: &[PathBuf],
        _options: DeployOptions,
    ) -> Result<(), AgentError> {
        let mut cmd = Command::new("docker");
        cmd.args(["stack", "deploy", "--prune", "--with-registry-auth"]);
        for file in files {
            cmd.arg("--compose-file").arg(file);
        }
        cmd.arg(project);
        run_command(cmd, "docker stack deploy").await
    }

    async fn pull(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError> {
        let mut cmd = self.compose.command();
        cmd.args(["-p", project]);
        for file in files {
            cmd.arg("-f").arg(file);
        }
        cmd.arg("pull");
        run_command(cmd, "docker compose pull").await
    }

    async fn remove(&self, project: &str, _files: &[PathBuf]) -> Result<(), AgentError> {
        let mut cmd = Command::new("docker");
        cmd.args(["stack", "rm", project]);
        run_command(cmd, "docker stack rm").await
    }
}
