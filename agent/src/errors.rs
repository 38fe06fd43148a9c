//! Error types for the edgent agent

use thiserror::Error;

/// Main error type for the edgent agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Coordinator error: {0}")]
    CoordinatorError(String),

    #[error("Deploy error: {0}")]
    DeployError(String),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
