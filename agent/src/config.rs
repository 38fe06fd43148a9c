//! Stack manager configuration options

use std::path::PathBuf;

/// Environment variable naming the root directory for materialized stacks.
pub const ENV_EDGE_STACK_ROOT: &str = "EDGE_STACK_ROOT";

/// Environment variable holding the worker's idle sleep as a duration string.
pub const ENV_EDGE_STACK_QUEUE_SLEEP_INTERVAL: &str = "EDGE_STACK_QUEUE_SLEEP_INTERVAL";

/// Stack manager options
#[derive(Debug, Clone)]
pub struct StackManagerOptions {
    /// Root directory for materialized stack manifests
    pub stack_root: PathBuf,

    /// Directory where deployer binaries are looked up first
    pub assets_path: PathBuf,

    /// Worker idle sleep, as a duration string parsed at `start`
    pub queue_sleep_interval: String,
}

impl Default for StackManagerOptions {
    fn default() -> Self {
        Self {
            stack_root: PathBuf::from("/var/lib/edgent/stacks"),
            assets_path: PathBuf::from("/app"),
            queue_sleep_interval: "5s".to_string(),
        }
    }
}

impl StackManagerOptions {
    /// Build options from the environment, falling back to defaults for
    /// anything unset. The interval string is validated later, at `start`.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(root) = std::env::var(ENV_EDGE_STACK_ROOT) {
            if !root.is_empty() {
                options.stack_root = PathBuf::from(root);
            }
        }

        if let Ok(interval) = std::env::var(ENV_EDGE_STACK_QUEUE_SLEEP_INTERVAL) {
            if !interval.is_empty() {
                options.queue_sleep_interval = interval;
            }
        }

        options
    }
}
