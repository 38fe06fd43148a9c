//! Background worker driving stack actions
//!
//! A single worker sweeps the table for the next pending stack, performs
//! the pull phase (throttled and retried) followed by the deploy phase, or
//! tears the stack down. Deployer invocations run outside the state mutex
//! and race against the shutdown signal so a stop lands mid-operation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::deploy::DeployOptions;
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::models::stack::{EdgeStackStatusCode, StackId};
use crate::stack::manager::Shared;
use crate::stack::table::{StackAction, StackStatus, MAX_RETRIES, RETRY_INTERVAL};

/// Snapshot of a selected stack, taken under the mutex. The deployer
/// operates on these copies; the table record is re-read for every status
/// update.
struct PendingStack {
    id: StackId,
    action: StackAction,
    project_name: String,
    file_path: PathBuf,
}

/// Outcome of the pull phase
enum PullOutcome {
    /// Proceed to the deploy phase
    Proceed,

    /// Skip the deploy phase (throttled or failed attempt)
    Skip,

    /// The shutdown signal fired mid-pull
    Shutdown,
}

/// Whether the sweep loop keeps running
enum Flow {
    Continue,
    Shutdown,
}

type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Run the stack worker until the shutdown signal fires
pub(crate) async fn run<S, F>(
    shared: Arc<Shared>,
    interval: Duration,
    sleep_fn: S,
    mut shutdown_signal: ShutdownSignal,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    debug!("edge stack worker starting");

    loop {
        let Some(pending) = next_pending(&shared).await else {
            tokio::select! {
                _ = &mut shutdown_signal => {
                    debug!("shutting down edge stack worker");
                    return;
                }
                _ = sleep_fn(interval) => {}
            }
            continue;
        };

        let flow = match pending.action {
            StackAction::Deploy | StackAction::Update => {
                match pull_images(&shared, &pending, &mut shutdown_signal).await {
                    PullOutcome::Proceed => {
                        deploy_stack(&shared, &pending, &mut shutdown_signal).await
                    }
                    PullOutcome::Skip => Flow::Continue,
                    PullOutcome::Shutdown => Flow::Shutdown,
                }
            }
            StackAction::Delete => delete_stack(&shared, &pending, &mut shutdown_signal).await,
            StackAction::Idle => Flow::Continue,
        };

        if let Flow::Shutdown = flow {
            debug!("shutting down edge stack worker");
            return;
        }
    }
}

/// Select the next pending stack and snapshot what the deployer needs
async fn next_pending(shared: &Shared) -> Option<PendingStack> {
    let mut state = shared.state.lock().await;
    let record = state.table.next_pending()?;

    Some(PendingStack {
        id: record.id,
        action: record.action,
        project_name: format!("edge_{}", record.name),
        file_path: record.file_folder.join(&record.file_name),
    })
}

/// Pull phase: throttled, retried up to [`MAX_RETRIES`] attempts.
///
/// Attempts run on every sweep for the first [`RETRY_INTERVAL`] tries and
/// once per [`RETRY_INTERVAL`] sweeps after that.
async fn pull_images(
    shared: &Shared,
    pending: &PendingStack,
    shutdown_signal: &mut ShutdownSignal,
) -> PullOutcome {
    let deployer = {
        let mut state = shared.state.lock().await;
        let Some(record) = state.table.get_mut(&pending.id) else {
            return PullOutcome::Skip;
        };

        if !record.pre_pull_image && !record.re_pull_image {
            return PullOutcome::Proceed;
        }

        record.retries += 1;
        if record.retries > RETRY_INTERVAL && record.retries % RETRY_INTERVAL != 0 {
            return PullOutcome::Skip;
        }

        debug!(stack_identifier = pending.id, "stack pulling images");

        record.status = StackStatus::Deploying;
        state.deployer.clone()
    };

    let result = match deployer {
        Some(deployer) => {
            let files = std::slice::from_ref(&pending.file_path);
            tokio::select! {
                _ = &mut *shutdown_signal => return PullOutcome::Shutdown,
                result = deployer.pull(&pending.project_name, files) => result,
            }
        }
        None => Err(AgentError::EngineError(
            "no deployer configured".to_string(),
        )),
    };

    let mut state = shared.state.lock().await;
    let Some(record) = state.table.get_mut(&pending.id) else {
        return PullOutcome::Skip;
    };

    match result {
        Ok(()) => {
            record.action = StackAction::Idle;

            debug!(
                stack_identifier = pending.id,
                stack_version = record.version,
                "stack images pulled"
            );

            drop(state);
            report(shared, pending.id, EdgeStackStatusCode::ImagesPulled, "").await;

            PullOutcome::Proceed
        }
        Err(e) => {
            error!(
                error = %e,
                retries = record.retries,
                "stack images pull failed"
            );

            if record.retries < MAX_RETRIES {
                record.status = StackStatus::Retry;
            } else {
                record.status = StackStatus::Error;

                let message = e.to_string();
                drop(state);
                report(shared, pending.id, EdgeStackStatusCode::Error, &message).await;
            }

            PullOutcome::Skip
        }
    }
}

/// Deploy phase: one attempt, terminal for the current version
async fn deploy_stack(
    shared: &Shared,
    pending: &PendingStack,
    shutdown_signal: &mut ShutdownSignal,
) -> Flow {
    let (deployer, namespace) = {
        let mut state = shared.state.lock().await;
        let Some(record) = state.table.get_mut(&pending.id) else {
            return Flow::Continue;
        };

        debug!(
            stack_identifier = pending.id,
            stack_name = %pending.project_name,
            "stack deployment"
        );

        record.status = StackStatus::Deploying;
        record.action = StackAction::Idle;
        let namespace = record.namespace.clone();

        (state.deployer.clone(), namespace)
    };

    let result = match deployer {
        Some(deployer) => {
            let files = std::slice::from_ref(&pending.file_path);
            let options = DeployOptions { namespace };
            tokio::select! {
                _ = &mut *shutdown_signal => return Flow::Shutdown,
                result = deployer.deploy(&pending.project_name, files, options) => result,
            }
        }
        None => Err(AgentError::EngineError(
            "no deployer configured".to_string(),
        )),
    };

    let mut state = shared.state.lock().await;
    let Some(record) = state.table.get_mut(&pending.id) else {
        return Flow::Continue;
    };

    match result {
        Ok(()) => {
            debug!(
                stack_identifier = pending.id,
                stack_version = record.version,
                "stack deployed"
            );

            record.status = StackStatus::Done;

            drop(state);
            report(shared, pending.id, EdgeStackStatusCode::Ok, "").await;
        }
        Err(e) => {
            error!(error = %e, "stack deployment failed");

            record.status = StackStatus::Error;

            let message = e.to_string();
            drop(state);
            report(shared, pending.id, EdgeStackStatusCode::Error, &message).await;
        }
    }

    Flow::Continue
}

/// Delete action: remove the project, its manifest directory, and the
/// coordinator status record, then drop the stack from the table.
///
/// Every failure leaves the record in Error; the next snapshot that still
/// omits the stack re-queues the deletion.
async fn delete_stack(
    shared: &Shared,
    pending: &PendingStack,
    shutdown_signal: &mut ShutdownSignal,
) -> Flow {
    debug!(stack_identifier = pending.id, "removing stack");

    let deployer = {
        let state = shared.state.lock().await;
        state.deployer.clone()
    };

    let result = match deployer {
        Some(deployer) => {
            let files = std::slice::from_ref(&pending.file_path);
            tokio::select! {
                _ = &mut *shutdown_signal => return Flow::Shutdown,
                result = deployer.remove(&pending.project_name, files) => result,
            }
        }
        None => Err(AgentError::EngineError(
            "no deployer configured".to_string(),
        )),
    };

    if let Err(e) = result {
        error!(error = %e, "unable to remove stack");
        mark_delete_failed(shared, pending.id).await;
        return Flow::Continue;
    }

    let folder = pending
        .file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| pending.file_path.clone());
    if let Err(e) = Dir::new(folder).delete().await {
        error!(error = %e, "unable to delete stack files");
        mark_delete_failed(shared, pending.id).await;
        return Flow::Continue;
    }

    if let Err(e) = shared.coordinator.delete_edge_stack_status(pending.id).await {
        error!(error = %e, "unable to delete edge stack status");
        mark_delete_failed(shared, pending.id).await;
        return Flow::Continue;
    }

    let mut state = shared.state.lock().await;
    state.table.remove(&pending.id);

    Flow::Continue
}

async fn mark_delete_failed(shared: &Shared, id: StackId) {
    let mut state = shared.state.lock().await;
    if let Some(record) = state.table.get_mut(&id) {
        record.status = StackStatus::Error;
    }
}

/// Report progress to the coordinator; failures are logged, never
/// propagated.
async fn report(shared: &Shared, id: StackId, status: EdgeStackStatusCode, message: &str) {
    if let Err(e) = shared
        .coordinator
        .set_edge_stack_status(id, status, message)
        .await
    {
        error!(error = %e, "unable to update edge stack status");
    }
}
