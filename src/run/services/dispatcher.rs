//! Check-suite event dispatch: launch, relaunch, and cancel.

use super::{LaunchFailure, RunSupervisor, SupervisorError, TaskLauncher, WatchReport};
use crate::run::{
    domain::{CheckSuite, CheckSuiteAction, CheckSuiteEvent, CheckSuiteId, RunId},
    ports::{
        CiService, ExecutionBackend, MaterialsLoader, ReportSink, RevisionResolver,
        RevisionResolverError, TaskReport,
    },
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that stop an event from being handled as a whole.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The revision or its descriptor could not be read.
    #[error(transparent)]
    Resolve(#[from] RevisionResolverError),

    /// The supervisor could not be reached.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// The per-suite event gates were poisoned.
    #[error("suite gate lock poisoned: {0}")]
    GatePoisoned(String),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// What launching a suite produced.
#[derive(Debug, Default)]
pub struct SuiteLaunch {
    /// Runs now being watched.
    pub watched: Vec<RunId>,
    /// Specifications that failed to launch.
    pub failures: Vec<LaunchFailure>,
    /// Runs that launched but could not be handed to a watcher.
    pub unwatched: Vec<(RunId, SupervisorError)>,
}

/// Outcome of handling one event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// `requested`: runs were launched.
    Launched(SuiteLaunch),
    /// `rerequested`: outstanding watchers were stopped, their checks closed
    /// as cancelled, and runs relaunched.
    Relaunched {
        /// Reports of the watchers that were stopped.
        superseded: Vec<WatchReport>,
        /// The fresh launch.
        launch: SuiteLaunch,
    },
    /// `completed`: outstanding watchers were stopped.
    Cancelled(Vec<WatchReport>),
}

type SuiteGate = Arc<tokio::sync::Mutex<()>>;

/// Routes check-suite events to the launcher and supervisor.
///
/// Events for the same suite are handled one at a time, so a `completed` or
/// `rerequested` event always sees the runs an earlier `requested` event
/// launched.
pub struct CheckSuiteDispatcher<R, B, C, M, K>
where
    R: RevisionResolver,
    B: ExecutionBackend + 'static,
    C: CiService + 'static,
    M: MaterialsLoader,
    K: Clock + Send + Sync + 'static,
{
    resolver: Arc<R>,
    launcher: TaskLauncher<B, C, M, K>,
    supervisor: Arc<RunSupervisor<B, C, K>>,
    sink: Arc<dyn ReportSink>,
    gates: Mutex<HashMap<CheckSuiteId, SuiteGate>>,
}

impl<R, B, C, M, K> CheckSuiteDispatcher<R, B, C, M, K>
where
    R: RevisionResolver,
    B: ExecutionBackend + 'static,
    C: CiService + 'static,
    M: MaterialsLoader,
    K: Clock + Send + Sync + 'static,
{
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        resolver: Arc<R>,
        launcher: TaskLauncher<B, C, M, K>,
        supervisor: Arc<RunSupervisor<B, C, K>>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            resolver,
            launcher,
            supervisor,
            sink,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the supervisor holding the running watchers.
    #[must_use]
    pub const fn supervisor(&self) -> &Arc<RunSupervisor<B, C, K>> {
        &self.supervisor
    }

    /// Handles one event.
    ///
    /// `rerequested` cancels the suite's outstanding watchers and closes
    /// their checks before relaunching the same revision.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Resolve`] when the revision cannot be read,
    /// [`DispatchError::Supervisor`] when watcher state is unavailable, or
    /// [`DispatchError::GatePoisoned`] when the per-suite gates are.
    pub async fn dispatch(&self, event: &CheckSuiteEvent) -> DispatchResult<DispatchOutcome> {
        let suite = &event.suite;
        tracing::info!(
            suite_id = %suite.id(),
            action = %event.action,
            repository = %suite.repository(),
            head_sha = suite.head_sha(),
            "check suite event"
        );
        let gate = self.acquire_gate(suite.id())?;
        let outcome = {
            let _serialised = gate.lock().await;
            self.handle(event).await
        };
        self.release_gate(suite.id(), &gate);
        outcome
    }

    async fn handle(&self, event: &CheckSuiteEvent) -> DispatchResult<DispatchOutcome> {
        let suite = &event.suite;
        match event.action {
            CheckSuiteAction::Requested => {
                Ok(DispatchOutcome::Launched(self.launch_suite(suite).await?))
            }
            CheckSuiteAction::Rerequested => {
                let superseded = self.supervisor.supersede_suite(suite.id()).await?;
                let launch = self.launch_suite(suite).await?;
                Ok(DispatchOutcome::Relaunched { superseded, launch })
            }
            CheckSuiteAction::Completed => {
                let stopped = self.supervisor.cancel_suite(suite.id()).await?;
                self.sink.report(TaskReport::SuiteClosed { suite_id: suite.id() });
                Ok(DispatchOutcome::Cancelled(stopped))
            }
        }
    }

    fn acquire_gate(&self, suite_id: CheckSuiteId) -> DispatchResult<SuiteGate> {
        let mut gates = self
            .gates
            .lock()
            .map_err(|err| DispatchError::GatePoisoned(err.to_string()))?;
        Ok(Arc::clone(gates.entry(suite_id).or_default()))
    }

    fn release_gate(&self, suite_id: CheckSuiteId, gate: &SuiteGate) {
        match self.gates.lock() {
            Ok(mut gates) => {
                // Only the map and this caller still hold the gate.
                if Arc::strong_count(gate) == 2 {
                    gates.remove(&suite_id);
                }
            }
            Err(err) => {
                tracing::warn!(suite_id = %suite_id, error = %err, "suite gate lock poisoned");
            }
        }
    }

    async fn launch_suite(&self, suite: &CheckSuite) -> DispatchResult<SuiteLaunch> {
        let batches = self.resolver.resolve(suite).await.inspect_err(|err| {
            tracing::warn!(suite_id = %suite.id(), error = %err, "revision resolution failed");
        })?;
        self.sink.report(TaskReport::SuiteLaunching { suite_id: suite.id() });

        let mut launch = SuiteLaunch::default();
        for batch in &batches {
            let summary = self.launcher.launch(suite, batch).await;
            for task in summary.launched {
                let run_id = task.run_id().clone();
                match self.supervisor.spawn(task) {
                    Ok(()) => launch.watched.push(run_id),
                    Err(err) => {
                        tracing::error!(run_id = %run_id, error = %err, "run launched without a watcher");
                        launch.unwatched.push((run_id, err));
                    }
                }
            }
            launch.failures.extend(summary.failures);
        }
        Ok(launch)
    }
}
