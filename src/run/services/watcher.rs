//! Status watcher: the per-run polling loop.
//!
//! One watcher owns one [`RunTask`]. It waits a fixed interval, queries the
//! backend, folds the observation into the task's state, and asks the
//! reconciler whether the CI check needs an update. The loop ends on a
//! terminal state or when its cancellation signal is raised; the signal also
//! interrupts a backend or CI call that is still waiting.

use super::{BackoffPolicy, reconcile};
use crate::run::{
    domain::{CanonicalState, CheckUpdate, CiConclusion, RawRunStatus, RunTask},
    ports::{CiService, ExecutionBackend, ReportSink, TaskReport},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Timing parameters for a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    /// Wait between status polls.
    pub poll_interval: Duration,
    /// Retry policy for failed polls.
    pub backoff: BackoffPolicy,
    /// Wall-clock bound on a run; `None` polls until a terminal state.
    pub max_lifetime: Option<Duration>,
}

impl WatchSettings {
    /// Default wait between status polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
    /// Default wall-clock bound on a run.
    pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            backoff: BackoffPolicy::default(),
            max_lifetime: Some(Self::DEFAULT_MAX_LIFETIME),
        }
    }
}

/// Why a watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The task reached a terminal state.
    Terminal,
    /// The cancellation signal was raised first.
    Cancelled,
}

/// Final task record handed back when a watcher stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchReport {
    /// The task as the watcher left it.
    pub task: RunTask,
    /// Why the watcher stopped.
    pub exit: WatchExit,
}

enum PollOutcome {
    Status(RawRunStatus),
    Exhausted(u32),
    Cancelled,
}

#[derive(PartialEq, Eq)]
enum Applied {
    Done,
    Cancelled,
}

/// Polls the execution backend and keeps a CI check in step with it.
pub struct StatusWatcher<B, C, K>
where
    B: ExecutionBackend,
    C: CiService,
    K: Clock + Send + Sync,
{
    backend: Arc<B>,
    ci: Arc<C>,
    clock: Arc<K>,
    sink: Arc<dyn ReportSink>,
    settings: WatchSettings,
}

impl<B, C, K> StatusWatcher<B, C, K>
where
    B: ExecutionBackend,
    C: CiService,
    K: Clock + Send + Sync,
{
    /// Creates a watcher.
    #[must_use]
    pub const fn new(
        backend: Arc<B>,
        ci: Arc<C>,
        clock: Arc<K>,
        sink: Arc<dyn ReportSink>,
        settings: WatchSettings,
    ) -> Self {
        Self {
            backend,
            ci,
            clock,
            sink,
            settings,
        }
    }

    /// Returns the watcher's timing parameters.
    #[must_use]
    pub const fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    /// Runs the polling loop for `task` until it is terminal or `cancel`
    /// is raised. A dropped sender counts as cancellation.
    ///
    /// A task that is already terminal is returned without polling.
    pub async fn watch(&self, mut task: RunTask, mut cancel: watch::Receiver<bool>) -> WatchReport {
        if task.state().is_terminal() {
            return WatchReport {
                task,
                exit: WatchExit::Terminal,
            };
        }

        let deadline = self
            .settings
            .max_lifetime
            .and_then(|lifetime| Instant::now().checked_add(lifetime));

        loop {
            if sleep_or_cancel(self.settings.poll_interval, &mut cancel).await {
                return self.cancelled(task);
            }

            if deadline.is_some_and(|limit| Instant::now() >= limit) {
                tracing::warn!(run_id = %task.run_id(), "run exceeded its lifetime");
                self.sink.report(TaskReport::LifetimeExceeded {
                    run_id: task.run_id().clone(),
                });
                if self.apply(&mut task, CanonicalState::Errored, &mut cancel).await
                    == Applied::Cancelled
                {
                    return self.cancelled(task);
                }
                return self.finished(task);
            }

            let observed = match self.poll(&task, &mut cancel).await {
                PollOutcome::Status(raw) => {
                    let state = CanonicalState::classify(&raw);
                    tracing::debug!(
                        run_id = %task.run_id(),
                        raw_state = raw.state(),
                        state = %state,
                        "status polled"
                    );
                    state
                }
                PollOutcome::Exhausted(attempts) => {
                    tracing::error!(run_id = %task.run_id(), attempts, "status polling gave up");
                    self.sink.report(TaskReport::BackoffExhausted {
                        run_id: task.run_id().clone(),
                        attempts,
                    });
                    CanonicalState::Errored
                }
                PollOutcome::Cancelled => return self.cancelled(task),
            };

            if self.apply(&mut task, observed, &mut cancel).await == Applied::Cancelled {
                return self.cancelled(task);
            }
            if task.state().is_terminal() {
                return self.finished(task);
            }
        }
    }

    async fn poll(&self, task: &RunTask, cancel: &mut watch::Receiver<bool>) -> PollOutcome {
        let backoff = self.settings.backoff;
        let mut attempt: u32 = 1;
        loop {
            let polled = tokio::select! {
                biased;
                () = cancellation(cancel) => return PollOutcome::Cancelled,
                polled = self.backend.status(task.endpoint(), task.run_id()) => polled,
            };
            match polled {
                Ok(raw) => return PollOutcome::Status(raw),
                Err(err) => {
                    tracing::warn!(run_id = %task.run_id(), attempt, error = %err, "status poll failed");
                    self.sink.report(TaskReport::PollFailed {
                        run_id: task.run_id().clone(),
                        attempt,
                        reason: err.to_string(),
                    });
                    if attempt >= backoff.max_attempts() {
                        return PollOutcome::Exhausted(attempt);
                    }
                    if sleep_or_cancel(backoff.delay_after(attempt), cancel).await {
                        return PollOutcome::Cancelled;
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn apply(
        &self,
        task: &mut RunTask,
        observed: CanonicalState,
        cancel: &mut watch::Receiver<bool>,
    ) -> Applied {
        let Some(transition) = task.observe(observed, &*self.clock) else {
            return Applied::Done;
        };
        self.sink.report(TaskReport::StateChanged {
            run_id: task.run_id().clone(),
            from: transition.from,
            to: transition.to,
        });

        let Some(update) = reconcile(transition.from, transition.to) else {
            return Applied::Done;
        };
        let current = &*task;
        tokio::select! {
            biased;
            () = cancellation(cancel) => Applied::Cancelled,
            () = self.publish(current, transition.to, update) => Applied::Done,
        }
    }

    /// Marks the check of a superseded task `completed/cancelled`.
    ///
    /// Tasks that already reached a terminal state keep the check they
    /// published.
    pub async fn close_superseded(&self, task: &RunTask) {
        if task.state().is_terminal() {
            return;
        }
        tracing::info!(run_id = %task.run_id(), state = %task.state(), "closing superseded check");
        self.publish(
            task,
            CanonicalState::Canceled,
            CheckUpdate::completed(CiConclusion::Cancelled),
        )
        .await;
    }

    async fn publish(&self, task: &RunTask, state: CanonicalState, update: CheckUpdate) {
        let request = task.update_request(update);
        match self.ci.update_check(task.check_ref(), &request).await {
            Ok(()) => {
                tracing::info!(run_id = %task.run_id(), update = %update, "check updated");
            }
            Err(err) => {
                tracing::warn!(run_id = %task.run_id(), update = %update, error = %err, "check update failed");
                self.sink.report(TaskReport::UpdateFailed {
                    run_id: task.run_id().clone(),
                    state,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn finished(&self, task: RunTask) -> WatchReport {
        self.sink.report(TaskReport::Finished {
            suite_id: task.suite_id(),
            run_id: task.run_id().clone(),
            state: task.state(),
        });
        WatchReport {
            task,
            exit: WatchExit::Terminal,
        }
    }

    fn cancelled(&self, task: RunTask) -> WatchReport {
        tracing::info!(run_id = %task.run_id(), state = %task.state(), "watcher cancelled");
        self.sink.report(TaskReport::Cancelled {
            suite_id: task.suite_id(),
            run_id: task.run_id().clone(),
        });
        WatchReport {
            task,
            exit: WatchExit::Cancelled,
        }
    }
}

/// Sleeps for `duration`; returns `true` if cancellation arrived first.
async fn sleep_or_cancel(duration: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;
        () = cancellation(cancel) => true,
        () = tokio::time::sleep(duration) => false,
    }
}

async fn cancellation(cancel: &mut watch::Receiver<bool>) {
    // Err means the sender is gone, which also ends the watch.
    let _raised = cancel.wait_for(|raised| *raised).await.is_ok();
}
