//! Recording in-memory report sink.

use crate::run::ports::{ReportSink, TaskReport};
use std::sync::{Arc, Mutex};

/// Sink that keeps every report for later inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportSink {
    reports: Arc<Mutex<Vec<TaskReport>>>,
}

impl InMemoryReportSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded reports in arrival order.
    #[must_use]
    pub fn reports(&self) -> Vec<TaskReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    /// Returns how many recorded reports satisfy `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&TaskReport) -> bool) -> usize {
        self.reports
            .lock()
            .map(|reports| reports.iter().filter(|report| predicate(report)).count())
            .unwrap_or_default()
    }
}

impl ReportSink for InMemoryReportSink {
    fn report(&self, report: TaskReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}
