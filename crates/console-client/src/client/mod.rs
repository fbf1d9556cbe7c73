//! Console backend HTTP client.

mod console_api;

pub use console_api::ConsoleClient;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ConsoleResult;
use crate::types::{ExecutionRequest, ExecutionStatusReport};

/// The two execution endpoints the tracker depends on.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Submit a snippet and return the backend-assigned execution id.
    async fn submit_execution(&self, request: &ExecutionRequest) -> ConsoleResult<String>;

    /// Fetch the current status of an execution.
    async fn execution_status(&self, execution_id: &str) -> ConsoleResult<ExecutionStatusReport>;
}

#[async_trait]
impl<T: ExecutionApi + ?Sized> ExecutionApi for Arc<T> {
    async fn submit_execution(&self, request: &ExecutionRequest) -> ConsoleResult<String> {
        (**self).submit_execution(request).await
    }

    async fn execution_status(&self, execution_id: &str) -> ConsoleResult<ExecutionStatusReport> {
        (**self).execution_status(execution_id).await
    }
}
