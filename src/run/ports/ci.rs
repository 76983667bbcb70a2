//! CI service port: check creation and updates.

use crate::run::domain::{CheckRef, CheckUpdateRequest, CreateCheckRequest};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for CI service operations.
pub type CiServiceResult<T> = Result<T, CiServiceError>;

/// Contract for the service that shows check status to the author.
#[async_trait]
pub trait CiService: Send + Sync {
    /// Creates a check and returns its reference.
    ///
    /// # Errors
    ///
    /// Returns [`CiServiceError`] when the service rejects the check or
    /// cannot be reached.
    async fn create_check(&self, request: &CreateCheckRequest) -> CiServiceResult<CheckRef>;

    /// Updates an existing check.
    ///
    /// # Errors
    ///
    /// Returns [`CiServiceError::UnknownCheck`] when the reference is not
    /// recognised, or rejection and transport errors.
    async fn update_check(
        &self,
        check_ref: &CheckRef,
        request: &CheckUpdateRequest,
    ) -> CiServiceResult<()>;
}

/// Errors returned by CI service adapters.
#[derive(Debug, Clone, Error)]
pub enum CiServiceError {
    /// The service rejected the request.
    #[error("CI service rejected request: {0}")]
    Rejected(String),

    /// The check reference is not recognised.
    #[error("unknown check {0}")]
    UnknownCheck(CheckRef),

    /// Transport or protocol failure.
    #[error("CI service transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl CiServiceError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
