//! Run task aggregate: the live record of one launched run.

use super::{
    BackendEndpoint, CanonicalState, CheckRef, CheckSuiteId, CheckUpdate, CheckUpdateRequest,
    RunId, StateTransition,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Parameter object describing a run that was submitted and given a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedRun {
    /// Identifier assigned by the backend.
    pub run_id: RunId,
    /// Display name from the run specification.
    pub name: String,
    /// Backend the run was submitted to.
    pub endpoint: BackendEndpoint,
    /// Check suite that triggered the launch.
    pub suite_id: CheckSuiteId,
    /// CI check created for the run.
    pub check_ref: CheckRef,
}

/// Run task aggregate root.
///
/// Owned by exactly one watcher after launch. The check reference is fixed
/// at construction and the state only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTask {
    run_id: RunId,
    name: String,
    endpoint: BackendEndpoint,
    suite_id: CheckSuiteId,
    check_ref: CheckRef,
    state: CanonicalState,
    previous_state: Option<CanonicalState>,
    launched_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RunTask {
    /// Creates a scheduled task for a freshly launched run.
    #[must_use]
    pub fn launched(run: LaunchedRun, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            run_id: run.run_id,
            name: run.name,
            endpoint: run.endpoint,
            suite_id: run.suite_id,
            check_ref: run.check_ref,
            state: CanonicalState::Scheduled,
            previous_state: None,
            launched_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the backend run identifier.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Returns the originating check suite.
    #[must_use]
    pub const fn suite_id(&self) -> CheckSuiteId {
        self.suite_id
    }

    /// Returns the CI check reference.
    #[must_use]
    pub const fn check_ref(&self) -> &CheckRef {
        &self.check_ref
    }

    /// Returns the current canonical state.
    #[must_use]
    pub const fn state(&self) -> CanonicalState {
        self.state
    }

    /// Returns the state held before the latest transition.
    #[must_use]
    pub const fn previous_state(&self) -> Option<CanonicalState> {
        self.previous_state
    }

    /// Returns the launch timestamp.
    #[must_use]
    pub const fn launched_at(&self) -> DateTime<Utc> {
        self.launched_at
    }

    /// Returns the latest transition timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies an observed state.
    ///
    /// Returns the transition when the observation moved the task forward,
    /// or `None` for repeats, regressions, and unrecognised values.
    pub fn observe(
        &mut self,
        observed: CanonicalState,
        clock: &impl Clock,
    ) -> Option<StateTransition> {
        let next = self.state.advance(observed);
        if next == self.state {
            return None;
        }
        let transition = StateTransition {
            from: self.state,
            to: next,
        };
        self.previous_state = Some(self.state);
        self.state = next;
        self.updated_at = clock.utc();
        Some(transition)
    }

    /// Builds the CI update request carrying this task's identity.
    #[must_use]
    pub fn update_request(&self, update: CheckUpdate) -> CheckUpdateRequest {
        CheckUpdateRequest {
            name: self.name.clone(),
            external_id: self.run_id.as_str().to_owned(),
            update,
        }
    }
}
