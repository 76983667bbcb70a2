//! Canonical run states and the transition table the watcher follows.

use super::ParseCanonicalStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass/fail result the backend reports for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every instance of the run passed.
    Success,
    /// The run failed, or the backend reported an outcome the bridge cannot
    /// confirm as a pass.
    Failure,
}

impl RunOutcome {
    /// Classifies the backend's outcome field.
    ///
    /// Only an explicit `success` counts as a pass; a missing or unrecognised
    /// outcome is never reported as success.
    #[must_use]
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "success" => Self::Success,
            _ => Self::Failure,
        }
    }

    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Raw status document returned by the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRunStatus {
    state: String,
    outcome: Option<String>,
}

impl RawRunStatus {
    /// Creates a raw status carrying only a state value.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            outcome: None,
        }
    }

    /// Adds the backend's reported outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Returns the raw state value.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the raw outcome value, if reported.
    #[must_use]
    pub fn outcome(&self) -> Option<&str> {
        self.outcome.as_deref()
    }
}

/// The bridge's normalised classification of a run's backend status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum CanonicalState {
    /// Accepted by the backend but not yet running.
    Scheduled,
    /// Running on the backend.
    Processing,
    /// Finished with the given outcome.
    Complete(RunOutcome),
    /// Cancelled on the backend.
    Canceled,
    /// The bridge gave up determining the outcome.
    Errored,
    /// The backend reported a value the bridge does not recognise.
    Unknown,
}

impl CanonicalState {
    /// Classifies a raw backend status.
    #[must_use]
    pub fn classify(raw: &RawRunStatus) -> Self {
        let normalized = raw.state().trim().to_ascii_lowercase();
        match normalized.as_str() {
            "scheduled" => Self::Scheduled,
            "processing" => Self::Processing,
            "complete" => Self::Complete(RunOutcome::classify(raw.outcome())),
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// Returns whether the state ends the run's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete(_) | Self::Canceled | Self::Errored)
    }

    /// Returns whether moving from `self` to `target` is a forward step.
    ///
    /// The backend may skip `processing`, so scheduled runs may jump straight
    /// to any terminal state. Repeats, regressions, moves into `unknown`, and
    /// any move out of a terminal state are rejected.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Scheduled,
                Self::Processing | Self::Complete(_) | Self::Canceled | Self::Errored
            ) | (
                Self::Processing,
                Self::Complete(_) | Self::Canceled | Self::Errored
            )
        )
    }

    /// Returns the state reached after observing `observed`.
    #[must_use]
    pub const fn advance(self, observed: Self) -> Self {
        if self.can_transition_to(observed) {
            observed
        } else {
            self
        }
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Complete(RunOutcome::Success) => "complete:success",
            Self::Complete(RunOutcome::Failure) => "complete:failure",
            Self::Canceled => "canceled",
            Self::Errored => "errored",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CanonicalState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CanonicalState {
    type Error = ParseCanonicalStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "processing" => Ok(Self::Processing),
            "complete:success" => Ok(Self::Complete(RunOutcome::Success)),
            "complete:failure" => Ok(Self::Complete(RunOutcome::Failure)),
            "canceled" => Ok(Self::Canceled),
            "errored" => Ok(Self::Errored),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseCanonicalStateError(value.to_owned())),
        }
    }
}

/// A forward move between two canonical states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// State before the observation.
    pub from: CanonicalState,
    /// State after the observation.
    pub to: CanonicalState,
}
