//! Coordinator client interface

use async_trait::async_trait;

use crate::errors::AgentError;
use crate::models::stack::{EdgeStackConfig, EdgeStackStatusCode, StackId};

/// Client-side view of the coordinator's edge stack API.
///
/// The stack manager consumes this as an opaque interface; the
/// reqwest-backed implementation lives in [`crate::http`].
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    /// Fetch the deployable configuration for a stack.
    async fn edge_stack_config(&self, id: StackId) -> Result<EdgeStackConfig, AgentError>;

    /// Report stack progress to the coordinator.
    async fn set_edge_stack_status(
        &self,
        id: StackId,
        status: EdgeStackStatusCode,
        message: &str,
    ) -> Result<(), AgentError>;

    /// Drop the coordinator-side status record for a removed stack.
    async fn delete_edge_stack_status(&self, id: StackId) -> Result<(), AgentError>;
}
