//! Static in-memory revision resolver.

use crate::run::{
    domain::{CheckSuite, RunBatch},
    ports::{RevisionResolver, RevisionResolverError, RevisionResolverResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
enum Resolution {
    Batches(Vec<RunBatch>),
    FetchFailure(String),
    Malformed(String),
}

/// Resolver answering from batches registered per head revision.
#[derive(Debug, Clone, Default)]
pub struct StaticRevisionResolver {
    state: Arc<RwLock<StaticResolverState>>,
}

#[derive(Debug, Default)]
struct StaticResolverState {
    revisions: HashMap<String, Resolution>,
    resolutions: usize,
}

impl StaticRevisionResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the batches declared at `head_sha`.
    ///
    /// # Errors
    ///
    /// Returns fetch errors when lock acquisition fails.
    pub fn insert(
        &self,
        head_sha: impl Into<String>,
        batches: Vec<RunBatch>,
    ) -> RevisionResolverResult<()> {
        self.store(head_sha.into(), Resolution::Batches(batches))
    }

    /// Makes fetching `head_sha` fail.
    ///
    /// # Errors
    ///
    /// Returns fetch errors when lock acquisition fails.
    pub fn fail_fetch(
        &self,
        head_sha: impl Into<String>,
        message: impl Into<String>,
    ) -> RevisionResolverResult<()> {
        self.store(head_sha.into(), Resolution::FetchFailure(message.into()))
    }

    /// Makes the descriptor at `head_sha` malformed.
    ///
    /// # Errors
    ///
    /// Returns fetch errors when lock acquisition fails.
    pub fn malformed(
        &self,
        head_sha: impl Into<String>,
        message: impl Into<String>,
    ) -> RevisionResolverResult<()> {
        self.store(head_sha.into(), Resolution::Malformed(message.into()))
    }

    /// Returns how many resolutions were requested.
    ///
    /// # Errors
    ///
    /// Returns fetch errors when lock acquisition fails.
    pub fn resolutions(&self) -> RevisionResolverResult<usize> {
        self.state
            .read()
            .map(|state| state.resolutions)
            .map_err(|err| RevisionResolverError::fetch(std::io::Error::other(err.to_string())))
    }

    fn store(&self, head_sha: String, resolution: Resolution) -> RevisionResolverResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| RevisionResolverError::fetch(std::io::Error::other(err.to_string())))?;
        state.revisions.insert(head_sha, resolution);
        Ok(())
    }
}

#[async_trait]
impl RevisionResolver for StaticRevisionResolver {
    async fn resolve(&self, suite: &CheckSuite) -> RevisionResolverResult<Vec<RunBatch>> {
        let mut state = self
            .state
            .write()
            .map_err(|err| RevisionResolverError::fetch(std::io::Error::other(err.to_string())))?;
        state.resolutions = state.resolutions.saturating_add(1);
        match state.revisions.get(suite.head_sha()) {
            Some(Resolution::Batches(batches)) => Ok(batches.clone()),
            Some(Resolution::FetchFailure(message)) => Err(RevisionResolverError::fetch(
                std::io::Error::other(message.clone()),
            )),
            Some(Resolution::Malformed(message)) => {
                Err(RevisionResolverError::Parse(message.clone()))
            }
            None => Err(RevisionResolverError::fetch(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("revision {} not found", suite.head_sha()),
            ))),
        }
    }
}
