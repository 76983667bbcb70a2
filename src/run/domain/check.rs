//! CI check vocabulary: statuses, conclusions, and request payloads.

use super::{CheckSuiteId, RepositoryFullName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status column of a CI check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiStatus {
    /// Waiting to start.
    Queued,
    /// Currently running.
    InProgress,
    /// Finished; a conclusion is attached.
    Completed,
}

impl CiStatus {
    /// Returns the CI service's wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CiStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Conclusion of a completed CI check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiConclusion {
    /// The run passed.
    Success,
    /// The run failed or its outcome could not be determined.
    Failure,
    /// The run was cancelled.
    Cancelled,
}

impl CiConclusion {
    /// Returns the CI service's wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CiConclusion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Status and optional conclusion to push to a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckUpdate {
    status: CiStatus,
    conclusion: Option<CiConclusion>,
}

impl CheckUpdate {
    /// Check is waiting to start.
    #[must_use]
    pub const fn queued() -> Self {
        Self {
            status: CiStatus::Queued,
            conclusion: None,
        }
    }

    /// Check is running.
    #[must_use]
    pub const fn in_progress() -> Self {
        Self {
            status: CiStatus::InProgress,
            conclusion: None,
        }
    }

    /// Check finished with `conclusion`.
    #[must_use]
    pub const fn completed(conclusion: CiConclusion) -> Self {
        Self {
            status: CiStatus::Completed,
            conclusion: Some(conclusion),
        }
    }

    /// Returns the check status.
    #[must_use]
    pub const fn status(&self) -> CiStatus {
        self.status
    }

    /// Returns the check conclusion, present only when completed.
    #[must_use]
    pub const fn conclusion(&self) -> Option<CiConclusion> {
        self.conclusion
    }
}

impl fmt::Display for CheckUpdate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conclusion {
            Some(conclusion) => write!(formatter, "{}/{conclusion}", self.status),
            None => write!(formatter, "{}", self.status),
        }
    }
}

/// Payload for creating a CI check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckRequest {
    /// Repository the check belongs to.
    pub repository: RepositoryFullName,
    /// Check suite that triggered the run.
    pub suite_id: CheckSuiteId,
    /// Display name, taken from the run specification.
    pub name: String,
    /// Revision the check is attached to.
    pub head_sha: String,
    /// Identifier tying the check back to the backend run.
    pub external_id: String,
    /// Initial status and conclusion.
    pub initial: CheckUpdate,
}

/// Payload for updating an existing CI check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckUpdateRequest {
    /// Display name of the check.
    pub name: String,
    /// Identifier tying the check back to the backend run.
    pub external_id: String,
    /// New status and conclusion.
    pub update: CheckUpdate,
}
