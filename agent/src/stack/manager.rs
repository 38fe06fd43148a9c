//! Edge stack manager
//!
//! Owns the stack table, applies coordinator snapshots to it, and controls
//! the background worker's lifecycle. One mutex guards the whole manager
//! state; reconciliation runs to completion under it, while the worker
//! releases it around deployer invocations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::StackManagerOptions;
use crate::coordinator::CoordinatorClient;
use crate::deploy::{self, Deployer};
use crate::errors::AgentError;
use crate::manifest;
use crate::models::stack::{
    EdgeStackData, EdgeStackStatusCode, EngineKind, RegistryCredential, StackId, StackVersion,
};
use crate::stack::table::{StackAction, StackRecord, StackStatus, StackTable};
use crate::stack::worker;
use crate::storage::layout::StackLayout;

/// Constructor for the deployer matching an engine kind.
///
/// Injectable so tests can substitute a recording deployer; defaults to
/// [`deploy::build_deployer`].
pub type DeployerFactory =
    Box<dyn Fn(EngineKind, &Path) -> Result<Arc<dyn Deployer>, AgentError> + Send + Sync>;

pub(crate) struct ManagerState {
    pub(crate) table: StackTable,
    pub(crate) engine: Option<EngineKind>,
    pub(crate) deployer: Option<Arc<dyn Deployer>>,
    pub(crate) enabled: bool,
    stop_tx: Option<broadcast::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

pub(crate) struct Shared {
    pub(crate) coordinator: Arc<dyn CoordinatorClient>,
    pub(crate) layout: StackLayout,
    pub(crate) state: Mutex<ManagerState>,
    assets_path: PathBuf,
    queue_sleep_interval: String,
    deployer_factory: DeployerFactory,
}

/// Service managing edge stacks on this node
pub struct StackManager {
    shared: Arc<Shared>,
}

impl StackManager {
    /// Create a new stack manager. No worker runs until [`start`] and no
    /// deployer exists until [`set_engine_status`].
    ///
    /// [`start`]: StackManager::start
    /// [`set_engine_status`]: StackManager::set_engine_status
    pub fn new(coordinator: Arc<dyn CoordinatorClient>, options: StackManagerOptions) -> Self {
        Self::with_deployer_factory(
            coordinator,
            options,
            Box::new(|kind, assets_path| deploy::build_deployer(kind, assets_path)),
        )
    }

    /// Create a stack manager with a custom deployer factory, letting tests
    /// substitute a recording deployer.
    pub fn with_deployer_factory(
        coordinator: Arc<dyn CoordinatorClient>,
        options: StackManagerOptions,
        deployer_factory: DeployerFactory,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                coordinator,
                layout: StackLayout::new(options.stack_root),
                state: Mutex::new(ManagerState {
                    table: StackTable::default(),
                    engine: None,
                    deployer: None,
                    enabled: false,
                    stop_tx: None,
                    worker: None,
                }),
                assets_path: options.assets_path,
                queue_sleep_interval: options.queue_sleep_interval,
                deployer_factory,
            }),
        }
    }

    /// Launch the background worker. Idempotent; a malformed queue sleep
    /// interval is fatal.
    pub async fn start(&self) -> Result<(), AgentError> {
        let mut state = self.shared.state.lock().await;
        if state.stop_tx.is_some() {
            return Ok(());
        }

        let interval = humantime::parse_duration(&self.shared.queue_sleep_interval)
            .map_err(|e| {
                AgentError::ConfigError(format!(
                    "invalid queue sleep interval {:?}: {}",
                    self.shared.queue_sleep_interval, e
                ))
            })?;

        state.enabled = true;

        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            worker::run(
                shared,
                interval,
                tokio::time::sleep,
                Box::pin(async move {
                    let _ = stop_rx.recv().await;
                }),
            )
            .await;
        });

        state.stop_tx = Some(stop_tx);
        state.worker = Some(handle);

        Ok(())
    }

    /// Stop the background worker and disable reconciliation. Idempotent.
    pub async fn stop(&self) -> Result<(), AgentError> {
        let (stop_tx, handle) = {
            let mut state = self.shared.state.lock().await;
            state.enabled = false;
            (state.stop_tx.take(), state.worker.take())
        };

        if let Some(stop_tx) = stop_tx {
            let _ = stop_tx.send(());
        }

        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| AgentError::ShutdownError(e.to_string()))?;
        }

        Ok(())
    }

    /// Switch the target orchestrator.
    ///
    /// Stops the worker and installs a freshly built deployer; the next
    /// [`start`](StackManager::start) relaunches the worker.
    pub async fn set_engine_status(&self, kind: EngineKind) -> Result<(), AgentError> {
        {
            let mut state = self.shared.state.lock().await;
            if state.engine == Some(kind) {
                return Ok(());
            }
            state.engine = Some(kind);
        }

        self.stop().await?;

        let deployer = (self.shared.deployer_factory)(kind, &self.shared.assets_path)?;

        let mut state = self.shared.state.lock().await;
        state.deployer = Some(deployer);

        Ok(())
    }

    /// Apply a desired-state snapshot from the coordinator.
    ///
    /// The first coordinator or manifest error aborts the snapshot;
    /// already-processed stacks stay committed and the rest are retried on
    /// the next snapshot. A no-op while the manager is stopped.
    pub async fn update_stacks_status(
        &self,
        desired: &HashMap<StackId, StackVersion>,
    ) -> Result<(), AgentError> {
        let mut state = self.shared.state.lock().await;
        if !state.enabled {
            return Ok(());
        }

        for (&id, &version) in desired {
            self.process_stack(&mut state, id, version).await?;
        }

        state.table.mark_removed(desired);

        Ok(())
    }

    async fn process_stack(
        &self,
        state: &mut ManagerState,
        id: StackId,
        version: StackVersion,
    ) -> Result<(), AgentError> {
        let mut record = match state.table.get(&id) {
            Some(existing) => {
                if existing.version == version {
                    return Ok(());
                }

                debug!(stack_identifier = id, "marking stack for update");

                let mut record = existing.clone();
                record.action = StackAction::Update;
                record.version = version;
                record.status = StackStatus::Pending;
                record
            }
            None => {
                debug!(stack_identifier = id, "marking stack for deployment");

                StackRecord::new(id, version)
            }
        };

        let config = self.shared.coordinator.edge_stack_config(id).await?;

        record.name = config.name;
        record.registry_credentials = config.registry_credentials;
        record.namespace = config.namespace;
        record.pre_pull_image = config.pre_pull_image;
        record.re_pull_image = config.re_pull_image;

        let (folder, file_name) = manifest::write_manifest(
            &self.shared.layout,
            id,
            state.engine,
            &record.name,
            &config.file_content,
            &record.registry_credentials,
        )
        .await?;

        record.file_folder = folder;
        record.file_name = file_name;

        debug!(
            stack_identifier = id,
            stack_name = %record.name,
            "stack acknowledged"
        );

        state.table.insert(record);

        self.shared
            .coordinator
            .set_edge_stack_status(id, EdgeStackStatusCode::Acknowledged, "")
            .await
    }

    /// Accept an out-of-band stack push and schedule its deployment.
    ///
    /// Performs the same transitions as snapshot reconciliation but skips
    /// the acknowledge report.
    pub async fn deploy_stack(&self, data: EdgeStackData) -> Result<(), AgentError> {
        self.apply_single(data, false).await
    }

    /// Accept an out-of-band deletion push and schedule the stack's
    /// removal.
    pub async fn delete_stack(&self, data: EdgeStackData) -> Result<(), AgentError> {
        self.apply_single(data, true).await
    }

    async fn apply_single(&self, data: EdgeStackData, delete: bool) -> Result<(), AgentError> {
        let mut state = self.shared.state.lock().await;

        let mut record = match state.table.get(&data.id) {
            Some(existing) => {
                let mut record = existing.clone();
                if delete {
                    record.action = StackAction::Delete;
                } else {
                    if record.version == data.version {
                        return Ok(());
                    }

                    debug!(stack_identifier = data.id, "marking stack for update");

                    record.action = StackAction::Update;
                }
                record
            }
            None if delete => {
                // Nothing tracked, nothing to tear down.
                debug!(stack_identifier = data.id, "ignoring deletion of unknown stack");
                return Ok(());
            }
            None => {
                debug!(stack_identifier = data.id, "marking stack for deployment");

                StackRecord::new(data.id, data.version)
            }
        };

        let (folder, file_name) = if delete {
            (
                self.shared.layout.stack_dir(data.id),
                manifest::manifest_file_name(state.engine, &data.name),
            )
        } else {
            manifest::write_manifest(
                &self.shared.layout,
                data.id,
                state.engine,
                &data.name,
                &data.file_content,
                &data.registry_credentials,
            )
            .await?
        };

        record.name = data.name;
        record.registry_credentials = data.registry_credentials;
        record.namespace = data.namespace;
        record.status = StackStatus::Pending;
        record.version = data.version;
        record.pre_pull_image = data.pre_pull_image;
        record.re_pull_image = data.re_pull_image;
        record.file_folder = folder;
        record.file_name = file_name;

        state.table.insert(record);

        Ok(())
    }

    /// Credentials of the stack currently being deployed, consumed by the
    /// registry credential helper. None when no deploy is in flight.
    pub async fn deploying_credentials(&self) -> Option<Vec<RegistryCredential>> {
        let state = self.shared.state.lock().await;
        state.table.deploying_credentials()
    }
}
