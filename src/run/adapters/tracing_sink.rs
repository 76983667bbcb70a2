//! Report sink that writes task reports to the `tracing` subscriber.

use crate::run::ports::{ReportSink, TaskReport};

/// Logs every report as a structured event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl TracingReportSink {
    /// Creates the sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ReportSink for TracingReportSink {
    fn report(&self, report: TaskReport) {
        match report {
            TaskReport::SuiteLaunching { suite_id } => {
                tracing::info!(%suite_id, "suite launch started");
            }
            TaskReport::SuiteClosed { suite_id } => tracing::info!(%suite_id, "suite closed"),
            TaskReport::Launched {
                suite_id,
                run_id,
                name,
            } => tracing::info!(%suite_id, %run_id, %name, "run launched"),
            TaskReport::LaunchFailed {
                suite_id,
                name,
                reason,
            } => tracing::warn!(%suite_id, %name, %reason, "run failed to launch"),
            TaskReport::FailureCheckRejected {
                suite_id,
                name,
                reason,
            } => tracing::error!(%suite_id, %name, %reason, "failed-launch check rejected"),
            TaskReport::PollFailed {
                run_id,
                attempt,
                reason,
            } => tracing::warn!(%run_id, attempt, %reason, "status poll failed"),
            TaskReport::BackoffExhausted { run_id, attempts } => {
                tracing::error!(%run_id, attempts, "status polling exhausted retries");
            }
            TaskReport::LifetimeExceeded { run_id } => {
                tracing::error!(%run_id, "run exceeded its lifetime");
            }
            TaskReport::StateChanged { run_id, from, to } => {
                tracing::info!(%run_id, %from, %to, "run state changed");
            }
            TaskReport::UpdateFailed {
                run_id,
                state,
                reason,
            } => tracing::warn!(%run_id, %state, %reason, "check update failed"),
            TaskReport::Finished {
                suite_id,
                run_id,
                state,
            } => tracing::info!(%suite_id, %run_id, %state, "run finished"),
            TaskReport::Cancelled { suite_id, run_id } => {
                tracing::info!(%suite_id, %run_id, "watcher cancelled");
            }
        }
    }
}
