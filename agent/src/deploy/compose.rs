//! Docker Compose deployer (standalone engine)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::deploy::{run_command, DeployOptions, Deployer};
use crate::errors::AgentError;

/// Which compose entry point to invoke
#[derive(Debug, Clone)]
pub(crate) enum ComposeBinary {
    /// A bundled `docker-compose` binary
    Standalone(PathBuf),

    /// The `docker compose` CLI plugin
    Plugin,
}

impl ComposeBinary {
    /// Prefer a bundled binary under the assets path, fall back to the
    /// docker CLI plugin.
    pub(crate) fn detect(assets_path: &Path) -> Self {
        let bundled = assets_path.join("docker-compose");
        if bundled.is_file() {
            debug!("using bundled compose binary at {}", bundled.display());
            ComposeBinary::Standalone(bundled)
        } else {
            ComposeBinary::Plugin
        }
    }

    /// A command with the compose entry point already applied
    pub(crate) fn command(&self) -> Command {
        match self {
            ComposeBinary::Standalone(path) => Command::new(path),
            ComposeBinary::Plugin => {
                let mut cmd = Command::new("docker");
                cmd.arg("compose");
                cmd
            }
        }
    }
}

/// Deployer for single-host docker compose projects
pub struct ComposeDeployer {
    binary: ComposeBinary,
}

impl ComposeDeployer {
    pub fn new(assets_path: &Path) -> Self {
        Self {
            binary: ComposeBinary::detect(assets_path),
        }
    }

    fn project_command(&self, project: &str, files: &[PathBuf]) -> Command {
        let mut cmd = self.binary.command();
        cmd.args(["-p", project]);
        for file in files {
            cmd.arg("-f").arg(file);
        }
        cmd
    }
}

#[async_trait]
impl Deployer for ComposeDeployer {
    async fn deploy(
        &self,
        project: &str,
        files: &[PathBuf],
        _options: DeployOptions,
    ) -> Result<(), AgentError> {
        let mut cmd = self.project_command(project, files);
        cmd.args(["up", "-d", "--remove-orphans"]);
        run_command(cmd, "docker compose up").await
    }

    async fn pull(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError> {
        let mut cmd = self.project_command(project, files);
        cmd.arg("pull");
        run_command(cmd, "docker compose pull").await
    }

    async fn remove(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError> {
        let mut cmd = self.project_command(project, files);
        cmd.args(["down", "--remove-orphans"]);
        run_command(cmd, "docker compose down").await
    }
}
