//! When steps for run status synchronisation scenarios.

use super::bridge::event;
use super::world::{RunSyncWorld, run_async};
use checkbridge::run::{domain::CheckSuiteAction, services::DispatchOutcome};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the check suite is requested")]
fn check_suite_requested(world: &mut RunSyncWorld) -> Result<(), eyre::Report> {
    let requested = event(CheckSuiteAction::Requested)?;
    let outcome = run_async(world.bridge.dispatcher.dispatch(&requested))
        .wrap_err("dispatch requested event")?;
    world.outcome = Some(outcome);
    Ok(())
}

#[when("the watchers finish")]
fn watchers_finish(world: &mut RunSyncWorld) -> Result<(), eyre::Report> {
    let expected = match world.outcome.as_ref() {
        Some(DispatchOutcome::Launched(launch)) => launch.watched.len(),
        other => return Err(eyre::eyre!("expected a launch outcome, got {other:?}")),
    };
    world.finished = run_async(world.bridge.wait_for_finished(expected))?;
    Ok(())
}
