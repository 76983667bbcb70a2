//! Per-check-suite health aggregation over task reports.

use crate::run::{
    domain::{CanonicalState, CheckSuiteId, RunOutcome},
    ports::{ReportSink, TaskReport},
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Counters describing how the runs of one check suite fared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteHealth {
    /// Runs submitted with a queued check.
    pub launched: usize,
    /// Specifications that failed to launch.
    pub launch_failures: usize,
    /// Runs that completed successfully.
    pub succeeded: usize,
    /// Runs that completed with a failure.
    pub failed: usize,
    /// Runs the backend cancelled.
    pub cancelled: usize,
    /// Runs whose outcome could not be determined.
    pub errored: usize,
    /// Watchers stopped by a cancellation signal.
    pub superseded: usize,
}

impl SuiteHealth {
    /// Returns how many specifications the suite attempted.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.launched.saturating_add(self.launch_failures)
    }

    /// Returns how many launched runs have not stopped yet.
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        let stopped = self
            .succeeded
            .saturating_add(self.failed)
            .saturating_add(self.cancelled)
            .saturating_add(self.errored)
            .saturating_add(self.superseded);
        self.launched.saturating_sub(stopped)
    }

    /// Renders a one-line summary, e.g. `2 of 5 runs failed to launch; ...`.
    #[must_use]
    pub fn summary(&self) -> String {
        let launch = if self.launch_failures > 0 {
            format!(
                "{} of {} runs failed to launch",
                self.launch_failures,
                self.attempted()
            )
        } else {
            format!("{} of {} runs launched", self.launched, self.attempted())
        };
        format!(
            "{launch}; {} succeeded, {} failed, {} errored, {} cancelled, {} superseded, {} outstanding",
            self.succeeded,
            self.failed,
            self.errored,
            self.cancelled,
            self.superseded,
            self.outstanding()
        )
    }

    const fn record(&mut self, report: &TaskReport) {
        match report {
            TaskReport::Launched { .. } => self.launched = self.launched.saturating_add(1),
            TaskReport::LaunchFailed { .. } => {
                self.launch_failures = self.launch_failures.saturating_add(1);
            }
            TaskReport::Finished { state, .. } => match state {
                CanonicalState::Complete(RunOutcome::Success) => {
                    self.succeeded = self.succeeded.saturating_add(1);
                }
                CanonicalState::Complete(RunOutcome::Failure) => {
                    self.failed = self.failed.saturating_add(1);
                }
                CanonicalState::Canceled => self.cancelled = self.cancelled.saturating_add(1),
                CanonicalState::Errored => self.errored = self.errored.saturating_add(1),
                CanonicalState::Scheduled | CanonicalState::Processing | CanonicalState::Unknown => {}
            },
            TaskReport::Cancelled { .. } => self.superseded = self.superseded.saturating_add(1),
            TaskReport::SuiteLaunching { .. }
            | TaskReport::SuiteClosed { .. }
            | TaskReport::FailureCheckRejected { .. }
            | TaskReport::PollFailed { .. }
            | TaskReport::BackoffExhausted { .. }
            | TaskReport::LifetimeExceeded { .. }
            | TaskReport::StateChanged { .. }
            | TaskReport::UpdateFailed { .. } => {}
        }
    }
}

const fn suite_of(report: &TaskReport) -> Option<CheckSuiteId> {
    match report {
        TaskReport::SuiteLaunching { suite_id }
        | TaskReport::SuiteClosed { suite_id }
        | TaskReport::Launched { suite_id, .. }
        | TaskReport::LaunchFailed { suite_id, .. }
        | TaskReport::Finished { suite_id, .. }
        | TaskReport::Cancelled { suite_id, .. } => Some(*suite_id),
        _ => None,
    }
}

/// Report sink that tallies per-suite health before forwarding.
///
/// Counters cover the latest launch of a suite: a relaunch starts them
/// afresh, and a closed suite is dropped once its summary is logged.
pub struct SuiteHealthTracker {
    inner: Arc<dyn ReportSink>,
    suites: RwLock<HashMap<CheckSuiteId, SuiteHealth>>,
}

impl SuiteHealthTracker {
    /// Wraps `inner`, which still receives every report.
    #[must_use]
    pub fn new(inner: Arc<dyn ReportSink>) -> Self {
        Self {
            inner,
            suites: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the health of `suite_id`, if any report mentioned it.
    #[must_use]
    pub fn health(&self, suite_id: CheckSuiteId) -> Option<SuiteHealth> {
        self.suites
            .read()
            .ok()
            .and_then(|suites| suites.get(&suite_id).copied())
    }

    /// Returns every tracked suite, ordered by identifier.
    #[must_use]
    pub fn all(&self) -> Vec<(CheckSuiteId, SuiteHealth)> {
        let mut entries: Vec<(CheckSuiteId, SuiteHealth)> = self
            .suites
            .read()
            .map(|suites| suites.iter().map(|(id, health)| (*id, *health)).collect())
            .unwrap_or_default();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}

impl ReportSink for SuiteHealthTracker {
    fn report(&self, report: TaskReport) {
        if let Some(suite_id) = suite_of(&report) {
            match self.suites.write() {
                Ok(mut suites) => match report {
                    TaskReport::SuiteLaunching { .. } => {
                        suites.insert(suite_id, SuiteHealth::default());
                    }
                    TaskReport::SuiteClosed { .. } => {
                        if let Some(health) = suites.remove(&suite_id) {
                            tracing::info!(suite_id = %suite_id, summary = %health.summary(), "suite health");
                        }
                    }
                    _ => suites.entry(suite_id).or_default().record(&report),
                },
                Err(err) => {
                    tracing::warn!(suite_id = %suite_id, error = %err, "suite health lock poisoned");
                }
            }
        }
        self.inner.report(report);
    }
}
