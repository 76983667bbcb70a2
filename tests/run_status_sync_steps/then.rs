//! Then steps for run status synchronisation scenarios.

use super::bridge::{FinishedRun, suite_id};
use super::world::{RunSyncWorld, parse_update, split_list};
use checkbridge::run::{
    domain::{CanonicalState, CheckUpdate, CiConclusion},
    ports::TaskReport,
};
use rstest_bdd_macros::then;

fn finished_run<'a>(world: &'a RunSyncWorld, name: &str) -> Result<&'a FinishedRun, eyre::Report> {
    world
        .finished
        .iter()
        .find(|report| report.name == name)
        .ok_or_else(|| eyre::eyre!("no finished watcher for run {name}"))
}

#[then(r#"the check for run "{name}" receives "{updates}""#)]
fn check_receives(world: &RunSyncWorld, name: String, updates: String) -> Result<(), eyre::Report> {
    let expected = split_list(&updates)
        .into_iter()
        .map(parse_update)
        .collect::<Result<Vec<CheckUpdate>, _>>()?;
    let report = finished_run(world, &name)?;
    let actual = world.bridge.ci.updates_for(report.run_id.as_str())?;
    eyre::ensure!(
        actual == expected,
        "run {name} published {actual:?}, expected {expected:?}"
    );
    Ok(())
}

#[then(r#"the run "{name}" ends "{state}""#)]
fn run_ends(world: &RunSyncWorld, name: String, state: String) -> Result<(), eyre::Report> {
    let expected = CanonicalState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let report = finished_run(world, &name)?;
    eyre::ensure!(
        report.state == expected,
        "run {name} ended {}, expected {expected}",
        report.state
    );
    Ok(())
}

#[then(r#"a failed check is published for "{name}""#)]
fn failed_check_published(world: &RunSyncWorld, name: String) -> Result<(), eyre::Report> {
    let check = world
        .bridge
        .ci
        .check_by_external_id(&name)?
        .ok_or_else(|| eyre::eyre!("no check published for {name}"))?;
    eyre::ensure!(
        check.current() == CheckUpdate::completed(CiConclusion::Failure),
        "check for {name} shows {}",
        check.current()
    );
    Ok(())
}

#[then(r#"the suite summary begins "{prefix}""#)]
fn suite_summary_begins(world: &RunSyncWorld, prefix: String) -> Result<(), eyre::Report> {
    let health = world
        .bridge
        .health
        .health(suite_id()?)
        .ok_or_else(|| eyre::eyre!("suite health missing"))?;
    let summary = health.summary();
    eyre::ensure!(
        summary.starts_with(&prefix),
        "summary {summary:?} does not begin with {prefix:?}"
    );
    Ok(())
}

#[then(r#"run "{name}" reported {count:u64} failed polls"#)]
fn run_reported_failed_polls(
    world: &RunSyncWorld,
    name: String,
    count: u64,
) -> Result<(), eyre::Report> {
    let report = finished_run(world, &name)?;
    let run_id = &report.run_id;
    let failed = u64::try_from(world.bridge.reports.count(|entry| {
        matches!(entry, TaskReport::PollFailed { run_id: failed_run, .. } if failed_run == run_id)
    }))?;
    eyre::ensure!(failed == count, "run {name} reported {failed} failed polls, expected {count}");
    Ok(())
}
