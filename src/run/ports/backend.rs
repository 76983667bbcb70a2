//! Execution backend port: run submission and status queries.

use crate::run::domain::{BackendEndpoint, RawRunStatus, RunId, RunRequest};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for execution backend operations.
pub type ExecutionBackendResult<T> = Result<T, ExecutionBackendError>;

/// Contract for the distributed test-execution service.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Submits a run and returns the identifier the backend assigned.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionBackendError::Rejected`] when the backend refuses
    /// the request or [`ExecutionBackendError::Transport`] when it cannot be
    /// reached.
    async fn submit(
        &self,
        endpoint: &BackendEndpoint,
        request: &RunRequest,
    ) -> ExecutionBackendResult<RunId>;

    /// Returns the raw status of a run.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionBackendError::UnknownRun`] when the backend has no
    /// record of the run, or transport errors.
    async fn status(
        &self,
        endpoint: &BackendEndpoint,
        run_id: &RunId,
    ) -> ExecutionBackendResult<RawRunStatus>;
}

/// Errors returned by execution backend adapters.
#[derive(Debug, Clone, Error)]
pub enum ExecutionBackendError {
    /// The backend rejected the request.
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// The backend does not know the run.
    #[error("backend has no run {0}")]
    UnknownRun(RunId),

    /// Transport or protocol failure.
    #[error("backend transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl ExecutionBackendError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
