//! Revision resolver port: turns a check suite into run batches.

use crate::run::domain::{CheckSuite, RunBatch};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for revision resolution.
pub type RevisionResolverResult<T> = Result<T, RevisionResolverError>;

/// Fetches the suite's head revision and reads its run descriptor.
#[async_trait]
pub trait RevisionResolver: Send + Sync {
    /// Resolves the run specifications declared at the suite's head revision.
    ///
    /// # Errors
    ///
    /// Returns [`RevisionResolverError::Fetch`] when the revision cannot be
    /// fetched or [`RevisionResolverError::Parse`] when the descriptor is
    /// malformed.
    async fn resolve(&self, suite: &CheckSuite) -> RevisionResolverResult<Vec<RunBatch>>;
}

/// Errors returned by revision resolvers.
#[derive(Debug, Clone, Error)]
pub enum RevisionResolverError {
    /// The revision could not be fetched.
    #[error("failed to fetch revision: {0}")]
    Fetch(Arc<dyn std::error::Error + Send + Sync>),

    /// The run descriptor is malformed.
    #[error("malformed run descriptor: {0}")]
    Parse(String),
}

impl RevisionResolverError {
    /// Wraps a fetch error.
    pub fn fetch(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Fetch(Arc::new(err))
    }
}
