//! Shared world state for run status synchronisation scenarios.

use super::bridge::{Bridge, FinishedRun, quick_settings};
use checkbridge::run::{
    adapters::memory::ScriptedPoll,
    domain::{CheckUpdate, CiConclusion, RunOutcome},
    services::DispatchOutcome,
};
use rstest::fixture;

/// Scenario world for run status synchronisation.
pub struct RunSyncWorld {
    pub bridge: Bridge,
    pub outcome: Option<DispatchOutcome>,
    pub finished: Vec<FinishedRun>,
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RunSyncWorld {
    RunSyncWorld {
        bridge: Bridge::new(quick_settings()),
        outcome: None,
        finished: Vec::new(),
    }
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Splits a comma-separated step argument.
pub fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parses a scripted backend answer such as `processing`,
/// `complete:success`, or `error`.
pub fn parse_poll(value: &str) -> ScriptedPoll {
    match value {
        "error" => ScriptedPoll::fail("scripted poll error"),
        "complete:success" => ScriptedPoll::complete(RunOutcome::Success),
        "complete:failure" => ScriptedPoll::complete(RunOutcome::Failure),
        state => ScriptedPoll::state(state),
    }
}

/// Parses a check update such as `in_progress` or `completed/cancelled`.
///
/// # Errors
///
/// Returns an error for unrecognised values.
pub fn parse_update(value: &str) -> Result<CheckUpdate, eyre::Report> {
    match value {
        "queued" => Ok(CheckUpdate::queued()),
        "in_progress" => Ok(CheckUpdate::in_progress()),
        "completed/success" => Ok(CheckUpdate::completed(CiConclusion::Success)),
        "completed/failure" => Ok(CheckUpdate::completed(CiConclusion::Failure)),
        "completed/cancelled" => Ok(CheckUpdate::completed(CiConclusion::Cancelled)),
        other => Err(eyre::eyre!("unknown check update in scenario: {other}")),
    }
}
