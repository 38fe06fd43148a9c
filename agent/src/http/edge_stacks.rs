//! Edge stack API client

use async_trait::async_trait;
use serde::Serialize;

use crate::coordinator::CoordinatorClient;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::stack::{EdgeStackConfig, EdgeStackStatusCode, StackId};

/// Status report payload
#[derive(Debug, Clone, Serialize)]
struct StatusUpdate<'a> {
    status: EdgeStackStatusCode,

    #[serde(skip_serializing_if = "str::is_empty")]
    message: &'a str,
}

#[async_trait]
impl CoordinatorClient for HttpClient {
    async fn edge_stack_config(&self, id: StackId) -> Result<EdgeStackConfig, AgentError> {
        let path = format!("/edge_stacks/{}/config", id);
        self.get(&path).await
    }

    async fn set_edge_stack_status(
        &self,
        id: StackId,
        status: EdgeStackStatusCode,
        message: &str,
    ) -> Result<(), AgentError> {
        let path = format!("/edge_stacks/{}/status", id);
        self.post(&path, &StatusUpdate { status, message }).await
    }

    async fn delete_edge_stack_status(&self, id: StackId) -> Result<(), AgentError> {
        let path = format!("/edge_stacks/{}/status", id);
        self.delete(&path).await
    }
}
