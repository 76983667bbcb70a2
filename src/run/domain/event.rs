//! Inbound check-suite events.

use super::{CheckSuiteId, RepositoryFullName, RunDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action carried by a check-suite event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSuiteAction {
    /// A new suite was requested for a revision.
    Requested,
    /// The author asked for the suite to run again.
    Rerequested,
    /// The suite finished.
    Completed,
}

impl CheckSuiteAction {
    /// Returns the wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Rerequested => "rerequested",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CheckSuiteAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CheckSuiteAction {
    type Error = RunDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requested" => Ok(Self::Requested),
            "rerequested" => Ok(Self::Rerequested),
            "completed" => Ok(Self::Completed),
            _ => Err(RunDomainError::UnsupportedAction(value.to_owned())),
        }
    }
}

/// The check suite an event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuite {
    id: CheckSuiteId,
    repository: RepositoryFullName,
    head_branch: String,
    head_sha: String,
    author: String,
}

impl CheckSuite {
    /// Creates a validated check suite.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::EmptyRevision`] when `head_sha` is blank.
    pub fn new(
        id: CheckSuiteId,
        repository: RepositoryFullName,
        head_branch: impl Into<String>,
        head_sha: impl Into<String>,
        author: impl Into<String>,
    ) -> Result<Self, RunDomainError> {
        let sha = head_sha.into();
        if sha.trim().is_empty() {
            return Err(RunDomainError::EmptyRevision);
        }
        Ok(Self {
            id,
            repository,
            head_branch: head_branch.into(),
            head_sha: sha.trim().to_owned(),
            author: author.into(),
        })
    }

    /// Returns the suite identifier.
    #[must_use]
    pub const fn id(&self) -> CheckSuiteId {
        self.id
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the head branch.
    #[must_use]
    pub fn head_branch(&self) -> &str {
        &self.head_branch
    }

    /// Returns the head revision.
    #[must_use]
    pub fn head_sha(&self) -> &str {
        &self.head_sha
    }

    /// Returns the login that triggered the suite.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }
}

/// A check-suite event after signature verification and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuiteEvent {
    /// What happened to the suite.
    pub action: CheckSuiteAction,
    /// The suite itself.
    pub suite: CheckSuite,
}

impl CheckSuiteEvent {
    /// Creates an event.
    #[must_use]
    pub const fn new(action: CheckSuiteAction, suite: CheckSuite) -> Self {
        Self { action, suite }
    }
}
