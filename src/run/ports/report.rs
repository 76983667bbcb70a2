//! Report sink port: structured task health events.
//!
//! Failures the watcher and launcher recover from are emitted here instead
//! of being dropped, so a supervisor can aggregate health per check suite.

use crate::run::domain::{CanonicalState, CheckSuiteId, RunId};
use serde::{Deserialize, Serialize};

/// A structured event about a run task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskReport {
    /// A suite revision resolved and a fresh launch is starting.
    SuiteLaunching {
        /// Check suite being launched.
        suite_id: CheckSuiteId,
    },
    /// The suite completed upstream and its watchers were stopped.
    SuiteClosed {
        /// Check suite that completed.
        suite_id: CheckSuiteId,
    },
    /// A run was submitted and its check created.
    Launched {
        /// Originating check suite.
        suite_id: CheckSuiteId,
        /// Backend run identifier.
        run_id: RunId,
        /// Run name.
        name: String,
    },
    /// A run specification could not be launched.
    LaunchFailed {
        /// Originating check suite.
        suite_id: CheckSuiteId,
        /// Run name.
        name: String,
        /// Failure description.
        reason: String,
    },
    /// The failed-launch check itself could not be created.
    FailureCheckRejected {
        /// Originating check suite.
        suite_id: CheckSuiteId,
        /// Run name.
        name: String,
        /// Failure description.
        reason: String,
    },
    /// A status query failed.
    PollFailed {
        /// Backend run identifier.
        run_id: RunId,
        /// One-based attempt number within the current poll.
        attempt: u32,
        /// Failure description.
        reason: String,
    },
    /// Status queries kept failing past the retry ceiling.
    BackoffExhausted {
        /// Backend run identifier.
        run_id: RunId,
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// The run outlived the configured wall-clock bound.
    LifetimeExceeded {
        /// Backend run identifier.
        run_id: RunId,
    },
    /// The task moved to a new canonical state.
    StateChanged {
        /// Backend run identifier.
        run_id: RunId,
        /// Previous state.
        from: CanonicalState,
        /// New state.
        to: CanonicalState,
    },
    /// The CI service rejected a status update.
    UpdateFailed {
        /// Backend run identifier.
        run_id: RunId,
        /// State the update was meant to publish.
        state: CanonicalState,
        /// Failure description.
        reason: String,
    },
    /// The task reached a terminal state and stopped polling.
    Finished {
        /// Originating check suite.
        suite_id: CheckSuiteId,
        /// Backend run identifier.
        run_id: RunId,
        /// Terminal state.
        state: CanonicalState,
    },
    /// The task was stopped by a cancellation signal.
    Cancelled {
        /// Originating check suite.
        suite_id: CheckSuiteId,
        /// Backend run identifier.
        run_id: RunId,
    },
}

/// Destination for task reports.
pub trait ReportSink: Send + Sync {
    /// Records a report. Implementations must not block for long.
    fn report(&self, report: TaskReport);
}
