//! Task group of running watchers keyed by run identifier.

use super::{StatusWatcher, WatchReport};
use crate::run::{
    domain::{CheckSuiteId, RunId, RunTask},
    ports::{CiService, ExecutionBackend},
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Errors returned by the supervisor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    /// The run already has a watcher.
    #[error("run {0} already has a watcher")]
    DuplicateWatch(RunId),

    /// The supervisor's state lock was poisoned.
    #[error("supervisor state lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

struct ActiveWatch {
    suite_id: CheckSuiteId,
    generation: u64,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<WatchReport>,
}

type Registry = Mutex<HashMap<RunId, ActiveWatch>>;

/// Spawns one watcher per run task and holds its cancellation signal.
///
/// Entries stay registered until their watcher stops, is cancelled, or is
/// shut down, so a run can never have two watchers at once.
pub struct RunSupervisor<B, C, K>
where
    B: ExecutionBackend + 'static,
    C: CiService + 'static,
    K: Clock + Send + Sync + 'static,
{
    watcher: Arc<StatusWatcher<B, C, K>>,
    active: Arc<Registry>,
    generations: AtomicU64,
}

impl<B, C, K> RunSupervisor<B, C, K>
where
    B: ExecutionBackend + 'static,
    C: CiService + 'static,
    K: Clock + Send + Sync + 'static,
{
    /// Creates an empty supervisor.
    #[must_use]
    pub fn new(watcher: Arc<StatusWatcher<B, C, K>>) -> Self {
        Self {
            watcher,
            active: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Starts watching `task` on the current Tokio runtime.
    ///
    /// The watcher removes its own entry when it stops on a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::DuplicateWatch`] when the run is already
    /// registered.
    pub fn spawn(&self, task: RunTask) -> SupervisorResult<()> {
        let mut active = self.lock()?;
        if active.contains_key(task.run_id()) {
            return Err(SupervisorError::DuplicateWatch(task.run_id().clone()));
        }

        let run_id = task.run_id().clone();
        let suite_id = task.suite_id();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let (cancel, cancel_rx) = watch::channel(false);
        let watcher = Arc::clone(&self.watcher);
        let registry = Arc::downgrade(&self.active);
        let owned_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            let report = watcher.watch(task, cancel_rx).await;
            deregister(&registry, &owned_run_id, generation);
            report
        });
        tracing::debug!(run_id = %run_id, suite_id = %suite_id, "watcher spawned");
        active.insert(
            run_id,
            ActiveWatch {
                suite_id,
                generation,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    /// Returns the runs whose watcher has not stopped yet, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LockPoisoned`] when state is unavailable.
    pub fn active_runs(&self) -> SupervisorResult<Vec<RunId>> {
        let active = self.lock()?;
        let mut runs: Vec<RunId> = active
            .iter()
            .filter(|(_, entry)| !entry.handle.is_finished())
            .map(|(run_id, _)| run_id.clone())
            .collect();
        runs.sort();
        Ok(runs)
    }

    /// Returns the number of registered watchers.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LockPoisoned`] when state is unavailable.
    pub fn registered_count(&self) -> SupervisorResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Stops the watcher for `run_id` and waits for it.
    ///
    /// Returns `None` when the run is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LockPoisoned`] when state is unavailable.
    pub async fn cancel_run(&self, run_id: &RunId) -> SupervisorResult<Option<WatchReport>> {
        let entry = self.lock()?.remove(run_id);
        let Some(watch_entry) = entry else {
            return Ok(None);
        };
        signal(&watch_entry);
        Ok(join(run_id, watch_entry.handle).await)
    }

    /// Stops every watcher launched for `suite_id` and waits for them.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LockPoisoned`] when state is unavailable.
    pub async fn cancel_suite(&self, suite_id: CheckSuiteId) -> SupervisorResult<Vec<WatchReport>> {
        let entries = self.take_where(|entry| entry.suite_id == suite_id)?;
        tracing::info!(suite_id = %suite_id, watchers = entries.len(), "cancelling suite watchers");
        Ok(stop_all(entries).await)
    }

    /// Stops every watcher launched for `suite_id` and marks the checks of
    /// runs that had not finished `completed/cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LockPoisoned`] when state is unavailable.
    pub async fn supersede_suite(&self, suite_id: CheckSuiteId) -> SupervisorResult<Vec<WatchReport>> {
        let reports = self.cancel_suite(suite_id).await?;
        for report in &reports {
            self.watcher.close_superseded(&report.task).await;
        }
        Ok(reports)
    }

    /// Cancels every watcher and waits for all of them.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::LockPoisoned`] when state is unavailable.
    pub async fn shutdown(&self) -> SupervisorResult<Vec<WatchReport>> {
        let entries = self.take_where(|_| true)?;
        tracing::info!(watchers = entries.len(), "shutting down run supervisor");
        Ok(stop_all(entries).await)
    }

    fn take_where(
        &self,
        predicate: impl Fn(&ActiveWatch) -> bool,
    ) -> SupervisorResult<Vec<(RunId, ActiveWatch)>> {
        let mut active = self.lock()?;
        let selected: Vec<RunId> = active
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(run_id, _)| run_id.clone())
            .collect();
        Ok(selected
            .into_iter()
            .filter_map(|run_id| active.remove(&run_id).map(|entry| (run_id, entry)))
            .collect())
    }

    fn lock(&self) -> SupervisorResult<MutexGuard<'_, HashMap<RunId, ActiveWatch>>> {
        self.active
            .lock()
            .map_err(|err| SupervisorError::LockPoisoned(err.to_string()))
    }
}

fn deregister(registry: &Weak<Registry>, run_id: &RunId, generation: u64) {
    let Some(active) = registry.upgrade() else {
        return;
    };
    match active.lock() {
        Ok(mut entries) => {
            if entries
                .get(run_id)
                .is_some_and(|entry| entry.generation == generation)
            {
                entries.remove(run_id);
                tracing::debug!(run_id = %run_id, "watcher deregistered");
            }
        }
        Err(err) => {
            tracing::warn!(run_id = %run_id, error = %err, "supervisor state lock poisoned");
        }
    }
}

fn signal(entry: &ActiveWatch) {
    let _was_raised = entry.cancel.send_replace(true);
}

async fn stop_all(entries: Vec<(RunId, ActiveWatch)>) -> Vec<WatchReport> {
    for (_, entry) in &entries {
        signal(entry);
    }
    let mut reports = Vec::with_capacity(entries.len());
    for (run_id, entry) in entries {
        if let Some(report) = join(&run_id, entry.handle).await {
            reports.push(report);
        }
    }
    reports
}

async fn join(run_id: &RunId, handle: JoinHandle<WatchReport>) -> Option<WatchReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(err) => {
            tracing::error!(run_id = %run_id, error = %err, "watcher task failed");
            None
        }
    }
}
