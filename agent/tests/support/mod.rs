//! Shared test support: recording mocks for the coordinator and deployer
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use edgent::config::StackManagerOptions;
use edgent::coordinator::CoordinatorClient;
use edgent::deploy::{DeployOptions, Deployer};
use edgent::errors::AgentError;
use edgent::models::stack::{EdgeStackConfig, EdgeStackStatusCode, StackId};
use edgent::stack::StackManager;

/// Coordinator stub serving canned configs and recording every report
#[derive(Default)]
pub struct MockCoordinator {
    configs: Mutex<HashMap<StackId, EdgeStackConfig>>,
    config_fetches: AtomicU32,
    status_reports: Mutex<Vec<(StackId, EdgeStackStatusCode, String)>>,
    deleted_statuses: Mutex<Vec<StackId>>,
}

impl MockCoordinator {
    pub fn set_config(&self, id: StackId, config: EdgeStackConfig) {
        self.configs.lock().unwrap().insert(id, config);
    }

    pub fn config_fetches(&self) -> u32 {
        self.config_fetches.load(Ordering::SeqCst)
    }

    /// Status codes reported for one stack, in order
    pub fn statuses(&self, id: StackId) -> Vec<EdgeStackStatusCode> {
        self.status_reports
            .lock()
            .unwrap()
            .iter()
            .filter(|(reported, _, _)| *reported == id)
            .map(|(_, status, _)| *status)
            .collect()
    }

    /// Last message reported for one stack
    pub fn last_message(&self, id: StackId) -> Option<String> {
        self.status_reports
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(reported, _, _)| *reported == id)
            .map(|(_, _, message)| message.clone())
    }

    pub fn deleted_statuses(&self) -> Vec<StackId> {
        self.deleted_statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoordinatorClient for MockCoordinator {
    async fn edge_stack_config(&self, id: StackId) -> Result<EdgeStackConfig, AgentError> {
        self.config_fetches.fetch_add(1, Ordering::SeqCst);
        self.configs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AgentError::CoordinatorError(format!("no config for stack {}", id)))
    }

    async fn set_edge_stack_status(
        &self,
        id: StackId,
        status: EdgeStackStatusCode,
        message: &str,
    ) -> Result<(), AgentError> {
        self.status_reports
            .lock()
            .unwrap()
            .push((id, status, message.to_string()));
        Ok(())
    }

    async fn delete_edge_stack_status(&self, id: StackId) -> Result<(), AgentError> {
        self.deleted_statuses.lock().unwrap().push(id);
        Ok(())
    }
}

/// Deployer stub recording calls, with scriptable pull/deploy failures
#[derive(Default)]
pub struct MockDeployer {
    deploys: Mutex<Vec<(String, Vec<PathBuf>, DeployOptions)>>,
    pulls: Mutex<Vec<(String, Vec<PathBuf>)>>,
    removes: Mutex<Vec<(String, Vec<PathBuf>)>>,
    pull_failures: AtomicU32,
    deploy_failures: AtomicU32,
    deploy_delay: Mutex<Option<Duration>>,
}

impl MockDeployer {
    /// Fail the first `n` pull calls; `u32::MAX` fails forever
    pub fn failing_pulls(n: u32) -> Self {
        let deployer = Self::default();
        deployer.pull_failures.store(n, Ordering::SeqCst);
        deployer
    }

    /// Fail the first `n` deploy calls
    pub fn failing_deploys(n: u32) -> Self {
        let deployer = Self::default();
        deployer.deploy_failures.store(n, Ordering::SeqCst);
        deployer
    }

    /// Make every deploy call linger, so tests can observe mid-deploy state
    pub fn set_deploy_delay(&self, delay: Duration) {
        *self.deploy_delay.lock().unwrap() = Some(delay);
    }

    pub fn deploy_count(&self) -> usize {
        self.deploys.lock().unwrap().len()
    }

    pub fn pull_count(&self) -> usize {
        self.pulls.lock().unwrap().len()
    }

    pub fn remove_count(&self) -> usize {
        self.removes.lock().unwrap().len()
    }

    pub fn last_deploy(&self) -> Option<(String, Vec<PathBuf>, DeployOptions)> {
        self.deploys.lock().unwrap().last().cloned()
    }

    pub fn last_remove(&self) -> Option<(String, Vec<PathBuf>)> {
        self.removes.lock().unwrap().last().cloned()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        let remaining = counter.load(Ordering::SeqCst);
        if remaining == 0 {
            return false;
        }
        if remaining != u32::MAX {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
        true
    }
}

#[async_trait]
impl Deployer for MockDeployer {
    async fn deploy(
        &self,
        project: &str,
        files: &[PathBuf],
        options: DeployOptions,
    ) -> Result<(), AgentError> {
        let delay = *self.deploy_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.deploys
            .lock()
            .unwrap()
            .push((project.to_string(), files.to_vec(), options));

        if Self::take_failure(&self.deploy_failures) {
            return Err(AgentError::DeployError("deploy failed".to_string()));
        }
        Ok(())
    }

    async fn pull(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError> {
        self.pulls
            .lock()
            .unwrap()
            .push((project.to_string(), files.to_vec()));

        if Self::take_failure(&self.pull_failures) {
            return Err(AgentError::DeployError("pull failed".to_string()));
        }
        Ok(())
    }

    async fn remove(&self, project: &str, files: &[PathBuf]) -> Result<(), AgentError> {
        self.removes
            .lock()
            .unwrap()
            .push((project.to_string(), files.to_vec()));
        Ok(())
    }
}

/// A manager wired to the given mocks, with a fast queue sleep
pub fn manager_with(
    coordinator: Arc<MockCoordinator>,
    deployer: Arc<MockDeployer>,
    root: &Path,
) -> StackManager {
    manager_with_interval(coordinator, deployer, root, "1ms")
}

pub fn manager_with_interval(
    coordinator: Arc<MockCoordinator>,
    deployer: Arc<MockDeployer>,
    root: &Path,
    interval: &str,
) -> StackManager {
    let options = StackManagerOptions {
        stack_root: root.to_path_buf(),
        assets_path: root.to_path_buf(),
        queue_sleep_interval: interval.to_string(),
    };

    StackManager::with_deployer_factory(
        coordinator,
        options,
        Box::new(move |_kind, _assets_path| {
            let deployer: Arc<dyn Deployer> = deployer.clone();
            Ok(deployer)
        }),
    )
}

/// A minimal stack config with no credentials and no pull flags
pub fn stack_config(name: &str, file_content: &str) -> EdgeStackConfig {
    EdgeStackConfig {
        name: name.to_string(),
        file_content: file_content.to_string(),
        registry_credentials: Vec::new(),
        namespace: None,
        pre_pull_image: false,
        re_pull_image: false,
    }
}

/// Poll until the condition holds, panicking after the timeout
pub async fn wait_for<F: Fn() -> bool>(what: &str, condition: F, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
