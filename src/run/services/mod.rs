//! Application services for run-state synchronisation.

mod backoff;
mod dispatcher;
mod health;
mod launcher;
mod reconciler;
mod supervisor;
mod watcher;

pub use backoff::BackoffPolicy;
pub use dispatcher::{
    CheckSuiteDispatcher, DispatchError, DispatchOutcome, DispatchResult, SuiteLaunch,
};
pub use health::{SuiteHealth, SuiteHealthTracker};
pub use launcher::{LaunchError, LaunchFailure, LaunchSummary, TaskLauncher, clean_path};
pub use reconciler::{check_update_for, reconcile};
pub use supervisor::{RunSupervisor, SupervisorError, SupervisorResult};
pub use watcher::{StatusWatcher, WatchExit, WatchReport, WatchSettings};
