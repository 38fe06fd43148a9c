//! Edge stack models

use serde::{Deserialize, Serialize};

/// Coordinator-assigned stack identifier
pub type StackId = u64;

/// Coordinator-assigned stack version
pub type StackVersion = u64;

/// Identity of the target orchestrator. Determines the deployer
/// implementation and the manifest filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    DockerStandalone,
    DockerSwarm,
    Kubernetes,
    Nomad,
}

/// Credentials for a private image registry, attached to a stack deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredential {
    /// Registry host, e.g. `registry.example.com`
    pub server_url: String,

    pub username: String,

    pub secret: String,
}

/// Deployable configuration for a stack, fetched from the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeStackConfig {
    pub name: String,

    /// Raw manifest bytes as authored on the coordinator
    pub file_content: String,

    #[serde(default)]
    pub registry_credentials: Vec<RegistryCredential>,

    /// Kubernetes namespace, when the engine is Kubernetes
    #[serde(default)]
    pub namespace: Option<String>,

    /// Pull images before the first deploy of this version
    #[serde(default)]
    pub pre_pull_image: bool,

    /// Pull images again on every redeploy of this version
    #[serde(default)]
    pub re_pull_image: bool,
}

/// Out-of-band stack push from the coordinator, carrying the full
/// configuration alongside identity and version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeStackData {
    pub id: StackId,

    pub name: String,

    pub version: StackVersion,

    pub file_content: String,

    #[serde(default)]
    pub registry_credentials: Vec<RegistryCredential>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub pre_pull_image: bool,

    #[serde(default)]
    pub re_pull_image: bool,
}

/// Stack progress codes reported to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStackStatusCode {
    /// The stack was observed and its manifest materialized
    Acknowledged,

    /// The pull phase completed
    ImagesPulled,

    /// The last deploy succeeded
    Ok,

    /// The stack failed terminally for this version
    Error,
}
